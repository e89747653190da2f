use axum::{Extension, Json, extract::State, http::StatusCode};

use api_types::category::{CategoryList, CategoryNew, CategoryView};
use engine::{Category, TransactionKind};

use crate::{ServerError, WorkspaceAccess, extract::JsonBody, server::ServerState};

fn category_view(category: Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        kind: category.kind.as_str().to_string(),
        created_at: category.created_at,
    }
}

pub async fn create(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let kind = TransactionKind::try_from(payload.kind.as_str())?;
    let category = state
        .engine
        .create_category(access.workspace_id, &payload.name, kind)
        .await?;
    Ok((StatusCode::CREATED, Json(category_view(category))))
}

pub async fn list(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
) -> Result<Json<CategoryList>, ServerError> {
    let categories = state
        .engine
        .list_categories(access.workspace_id)
        .await?
        .into_iter()
        .map(category_view)
        .collect();
    Ok(Json(CategoryList { categories }))
}
