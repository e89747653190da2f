use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, User, users,
    util::{hash_password, is_unique_violation, normalize_email, validate_email, verify_password},
};

use super::{Engine, normalize_optional_text};

const MIN_PASSWORD_LEN: usize = 8;

impl Engine {
    /// Register a new identity. Emails are unique after normalization.
    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> ResultEngine<User> {
        let email = normalize_email(email);
        validate_email(&email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(EngineError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        if self.find_user_by_email(&email).await?.is_some() {
            return Err(EngineError::ExistingKey(email));
        }

        let active = users::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            email: ActiveValue::Set(email.clone()),
            name: ActiveValue::Set(normalize_optional_text(name)),
            password_hash: ActiveValue::Set(hash_password(password)?),
            created_at: ActiveValue::Set(Utc::now()),
        };
        let model = active.insert(&self.database).await.map_err(|err| {
            if is_unique_violation(&err) {
                EngineError::ExistingKey(email.clone())
            } else {
                err.into()
            }
        })?;

        tracing::info!(user_id = %model.id, "user registered");
        Ok(model.into())
    }

    /// Check credentials. Unknown email and wrong password are
    /// indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> ResultEngine<User> {
        let email = normalize_email(email);
        let Some(model) = self.find_user_by_email(&email).await? else {
            return Err(EngineError::InvalidCredentials);
        };
        if !verify_password(password, &model.password_hash)? {
            return Err(EngineError::InvalidCredentials);
        }
        Ok(model.into())
    }

    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .map(User::from)
            .ok_or(EngineError::UserNotFound)
    }

    /// Resolve an email (trimmed, case-insensitive) to a user id.
    pub async fn find_user_id_by_email(&self, email: &str) -> ResultEngine<Uuid> {
        self.find_user_by_email(&normalize_email(email))
            .await?
            .map(|model| model.id)
            .ok_or(EngineError::UserNotFound)
    }

    async fn find_user_by_email(&self, normalized: &str) -> ResultEngine<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Email.eq(normalized))
            .one(&self.database)
            .await
            .map_err(Into::into)
    }
}
