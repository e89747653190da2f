//! Bearer-token identity.
//!
//! Tokens are HS256 JWTs whose `sub` is the user id. The middleware only
//! proves who the caller is; workspace access is decided in `access`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use engine::EngineError;

use crate::{ServerError, server::ServerState};

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
}

impl AuthConfig {
    pub(crate) fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_token_ttl_days)
    }
}

/// Identity of the caller, inserted into request extensions by the auth
/// middleware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

pub fn issue_token(user_id: Uuid, config: &AuthConfig) -> Result<String, ServerError> {
    let exp = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::minutes(config.token_ttl_minutes))
        .ok_or_else(|| EngineError::Internal("token expiry overflow".to_string()))?
        .timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: usize::try_from(exp).unwrap_or_default(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|err| EngineError::Internal(format!("encode token: {err}")).into())
}

/// Validate signature and expiry and return the subject.
pub fn decode_token(token: &str, config: &AuthConfig) -> Result<Uuid, ServerError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ServerError::Unauthorized)?;
    Uuid::parse_str(&data.claims.sub).map_err(|_| ServerError::Unauthorized)
}

pub(crate) async fn require_auth(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(Authorization(bearer)) = request.headers().typed_get::<Authorization<Bearer>>()
    else {
        return Err(ServerError::Unauthorized);
    };
    let user_id = decode_token(bearer.token(), &state.auth)?;

    request.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(request).await)
}
