//! Membership management endpoints. Listing needs `viewer`; every mutation
//! is layered behind the `owner` gate.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use api_types::membership::{
    MemberAdd, MemberAdded, MemberList, MemberRoleUpdate, MemberView, MembershipRole,
};
use engine::Role;

use crate::{ServerError, WorkspaceAccess, extract::JsonBody, server::ServerState};

pub(crate) fn role_view(role: Role) -> MembershipRole {
    match role {
        Role::Owner => MembershipRole::Owner,
        Role::Member => MembershipRole::Member,
        Role::Viewer => MembershipRole::Viewer,
    }
}

/// Only the target; the workspace comes from the gate.
#[derive(Deserialize)]
pub struct MemberPath {
    user_id: String,
}

impl MemberPath {
    fn target(&self) -> Result<Uuid, ServerError> {
        Uuid::parse_str(&self.user_id)
            .map_err(|_| ServerError::bad_request("invalid user id", &self.user_id))
    }
}

pub async fn list(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
) -> Result<Json<MemberList>, ServerError> {
    let members = state
        .workspaces
        .list_members(access.workspace_id)
        .await?
        .into_iter()
        .map(|m| MemberView {
            user_id: m.user_id,
            email: m.email,
            name: m.name,
            role: role_view(m.role),
            created_at: m.created_at,
        })
        .collect();

    Ok(Json(MemberList { members }))
}

pub async fn add(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<MemberAdd>,
) -> Result<(StatusCode, Json<MemberAdded>), ServerError> {
    let user_id = state
        .workspaces
        .add_member_by_email(access.workspace_id, &payload.email, &payload.role)
        .await?;
    Ok((StatusCode::CREATED, Json(MemberAdded { user_id })))
}

pub async fn update_role(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
    Path(path): Path<MemberPath>,
    JsonBody(payload): JsonBody<MemberRoleUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .workspaces
        .update_member_role(
            access.workspace_id,
            access.user_id,
            path.target()?,
            &payload.role,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
    Path(path): Path<MemberPath>,
) -> Result<StatusCode, ServerError> {
    state
        .workspaces
        .remove_member(access.workspace_id, access.user_id, path.target()?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
