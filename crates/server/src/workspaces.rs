use axum::{Extension, Json, extract::State, http::StatusCode};

use api_types::workspace::{
    WorkspaceList, WorkspaceListItem, WorkspaceNew, WorkspaceView, WorkspaceWithRole,
};
use engine::Workspace;

use crate::{
    AuthUser, ServerError, WorkspaceAccess, extract::JsonBody, members::role_view,
    server::ServerState,
};

fn workspace_view(workspace: Workspace) -> WorkspaceView {
    WorkspaceView {
        id: workspace.id,
        name: workspace.name,
        default_currency: workspace.default_currency,
        created_by: workspace.created_by,
        created_at: workspace.created_at,
    }
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<WorkspaceNew>,
) -> Result<(StatusCode, Json<WorkspaceWithRole>), ServerError> {
    let (workspace, role) = state
        .workspaces
        .create_workspace(user.user_id, &payload.name, payload.currency.as_deref())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(WorkspaceWithRole {
            workspace: workspace_view(workspace),
            role: role_view(role),
        }),
    ))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<WorkspaceList>, ServerError> {
    let workspaces = state
        .workspaces
        .list_my_workspaces(user.user_id)
        .await?
        .into_iter()
        .map(|item| WorkspaceListItem {
            id: item.id,
            name: item.name,
            role: role_view(item.role),
            created_at: item.created_at,
        })
        .collect();

    Ok(Json(WorkspaceList { workspaces }))
}

pub async fn get(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
) -> Result<Json<WorkspaceWithRole>, ServerError> {
    let (workspace, role) = state
        .workspaces
        .get_workspace(access.workspace_id, access.user_id)
        .await?;
    Ok(Json(WorkspaceWithRole {
        workspace: workspace_view(workspace),
        role: role_view(role),
    }))
}
