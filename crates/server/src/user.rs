use axum::{Extension, Json, extract::State, http::StatusCode};

use api_types::auth::{Login, RefreshRequest, RefreshResponse, Register, TokenResponse, UserView};
use engine::User;

use crate::{AuthUser, ServerError, auth::issue_token, extract::JsonBody, server::ServerState};

fn user_view(user: User) -> UserView {
    UserView {
        id: user.id,
        email: user.email,
        name: user.name,
        created_at: user.created_at,
    }
}

async fn token_response(state: &ServerState, user: User) -> Result<TokenResponse, ServerError> {
    let token = issue_token(user.id, &state.auth)?;
    let refresh_token = state
        .engine
        .issue_refresh_token(user.id, state.auth.refresh_ttl())
        .await?;
    Ok(TokenResponse {
        token,
        refresh_token,
        user: user_view(user),
    })
}

pub async fn register(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<Register>,
) -> Result<(StatusCode, Json<TokenResponse>), ServerError> {
    let user = state
        .engine
        .register_user(&payload.email, &payload.password, payload.name.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(token_response(&state, user).await?)))
}

pub async fn login(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<Login>,
) -> Result<Json<TokenResponse>, ServerError> {
    let user = state
        .engine
        .authenticate(&payload.email, &payload.password)
        .await?;
    Ok(Json(token_response(&state, user).await?))
}

/// Single use: the presented refresh token is revoked.
pub async fn refresh(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ServerError> {
    let (user_id, refresh_token) = state
        .engine
        .rotate_refresh_token(&payload.refresh_token, state.auth.refresh_ttl())
        .await?;
    let token = issue_token(user_id, &state.auth)?;
    Ok(Json(RefreshResponse {
        token,
        refresh_token,
    }))
}

pub async fn logout(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .revoke_refresh_token(&payload.refresh_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user(user.user_id).await?;
    Ok(Json(user_view(user)))
}
