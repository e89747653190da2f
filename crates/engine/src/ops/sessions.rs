//! Refresh tokens behind login, refresh and logout.
//!
//! Only the SHA-256 hash of a token is stored. Rotation is single use: the
//! presented token is revoked in the same DB transaction that issues its
//! successor, so replaying it fails with `InvalidRefreshToken`.

use chrono::{Duration, Utc};
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, refresh_tokens,
    util::{generate_refresh_token, hash_refresh_token},
};

use super::{Engine, with_tx};

async fn insert_token<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    ttl: Duration,
) -> ResultEngine<String> {
    let token = generate_refresh_token();
    let now = Utc::now();
    let active = refresh_tokens::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        user_id: ActiveValue::Set(user_id),
        token_hash: ActiveValue::Set(hash_refresh_token(&token)),
        expires_at: ActiveValue::Set(now + ttl),
        revoked_at: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
    };
    refresh_tokens::Entity::insert(active)
        .exec_without_returning(conn)
        .await?;
    Ok(token)
}

impl Engine {
    /// Issue a refresh token for `user_id`, valid for `ttl`.
    ///
    /// Expired tokens of the same user are purged on the way.
    pub async fn issue_refresh_token(&self, user_id: Uuid, ttl: Duration) -> ResultEngine<String> {
        if ttl <= Duration::zero() {
            return Err(EngineError::Validation(
                "refresh token ttl must be positive".to_string(),
            ));
        }
        refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .filter(refresh_tokens::Column::ExpiresAt.lte(Utc::now()))
            .exec(&self.database)
            .await?;

        let token = insert_token(&self.database, user_id, ttl).await?;
        tracing::debug!(%user_id, "refresh token issued");
        Ok(token)
    }

    /// Trade a valid refresh token for a new one. Returns the owner and the
    /// new token; the presented token is revoked.
    pub async fn rotate_refresh_token(
        &self,
        token: &str,
        ttl: Duration,
    ) -> ResultEngine<(Uuid, String)> {
        let token = token.trim();
        if token.is_empty() {
            return Err(EngineError::InvalidRefreshToken);
        }
        let hash = hash_refresh_token(token);

        let (user_id, next) = with_tx!(self, |db_tx| {
            let now = Utc::now();
            let Some(row) = refresh_tokens::Entity::find()
                .filter(refresh_tokens::Column::TokenHash.eq(hash.as_str()))
                .filter(refresh_tokens::Column::RevokedAt.is_null())
                .filter(refresh_tokens::Column::ExpiresAt.gt(now))
                .one(&db_tx)
                .await?
            else {
                return Err(EngineError::InvalidRefreshToken);
            };

            let revoked = refresh_tokens::Entity::update_many()
                .col_expr(refresh_tokens::Column::RevokedAt, Expr::value(now))
                .filter(refresh_tokens::Column::Id.eq(row.id))
                .filter(refresh_tokens::Column::RevokedAt.is_null())
                .exec(&db_tx)
                .await?
                .rows_affected;
            if revoked == 0 {
                return Err(EngineError::InvalidRefreshToken);
            }

            let next = insert_token(&db_tx, row.user_id, ttl).await?;
            Ok::<_, EngineError>((row.user_id, next))
        })?;

        tracing::debug!(%user_id, "refresh token rotated");
        Ok((user_id, next))
    }

    /// Revoke a refresh token. Unknown or already revoked tokens are a no-op.
    pub async fn revoke_refresh_token(&self, token: &str) -> ResultEngine<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(EngineError::Validation(
                "refresh_token must not be empty".to_string(),
            ));
        }
        let affected = refresh_tokens::Entity::update_many()
            .col_expr(refresh_tokens::Column::RevokedAt, Expr::value(Utc::now()))
            .filter(refresh_tokens::Column::TokenHash.eq(hash_refresh_token(token)))
            .filter(refresh_tokens::Column::RevokedAt.is_null())
            .exec(&self.database)
            .await?
            .rows_affected;

        tracing::debug!(revoked = affected, "refresh token revoked");
        Ok(())
    }
}
