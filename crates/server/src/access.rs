//! Workspace role gate.
//!
//! Layered per route group with a minimum role. Resolves the caller's role
//! for the `workspace_id` path parameter and either rejects the request or
//! attaches a [`WorkspaceAccess`] for the handler. Handlers never read the
//! raw path id.

use axum::{
    extract::{RawPathParams, Request, State, rejection::RawPathParamsRejection},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use engine::Role;

use crate::{AuthUser, ServerError, details, server::ServerState};

/// The authorized workspace and the caller's role in it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkspaceAccess {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
}

pub(crate) async fn require_viewer(
    state: State<ServerState>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    require_role(state, Role::Viewer, params, request, next).await
}

pub(crate) async fn require_member(
    state: State<ServerState>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    require_role(state, Role::Member, params, request, next).await
}

pub(crate) async fn require_owner(
    state: State<ServerState>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    require_role(state, Role::Owner, params, request, next).await
}

async fn require_role(
    State(state): State<ServerState>,
    min_role: Role,
    params: Result<RawPathParams, RawPathParamsRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(user) = request.extensions().get::<AuthUser>().copied() else {
        return Err(ServerError::Unauthorized);
    };

    let raw_id = params.ok().and_then(|params| {
        params
            .iter()
            .find(|(key, _)| *key == "workspace_id")
            .map(|(_, value)| value.to_string())
    });
    let Some(raw_id) = raw_id else {
        return Err(ServerError::bad_request("missing workspace id", ""));
    };
    let workspace_id = Uuid::parse_str(&raw_id)
        .map_err(|_| ServerError::bad_request("invalid workspace id", &raw_id))?;

    let role = match state.engine.user_role(workspace_id, user.user_id).await? {
        Some(role) => role,
        None if !state.engine.workspace_exists(workspace_id).await? => {
            return Err(ServerError::NotFound("workspace not found".to_string()));
        }
        None => {
            tracing::debug!(%workspace_id, user_id = %user.user_id, "not a workspace member");
            return Err(ServerError::Forbidden {
                error: "not a workspace member".to_string(),
                details: details([("required", min_role.as_str())]),
            });
        }
    };

    if !role.at_least(min_role) {
        tracing::debug!(
            %workspace_id,
            user_id = %user.user_id,
            %role,
            required = %min_role,
            "insufficient role"
        );
        return Err(ServerError::Forbidden {
            error: "insufficient role".to_string(),
            details: details([("required", min_role.as_str()), ("actual", role.as_str())]),
        });
    }

    request.extensions_mut().insert(WorkspaceAccess {
        workspace_id,
        user_id: user.user_id,
        role,
    });
    Ok(next.run(request).await)
}
