use axum::{Extension, Json, extract::State};

use api_types::budget::{BudgetList, BudgetMonthQuery, BudgetStatusView, BudgetUpsert, BudgetView};
use engine::BudgetInput;

use crate::{
    ServerError, WorkspaceAccess,
    extract::{JsonBody, QueryParams},
    server::ServerState,
};

pub async fn upsert(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<BudgetUpsert>,
) -> Result<Json<BudgetView>, ServerError> {
    let budget = state
        .engine
        .upsert_budget(
            access.workspace_id,
            BudgetInput {
                category_id: payload.category_id,
                year: payload.year,
                month: payload.month,
                amount_minor: payload.amount_minor,
            },
        )
        .await?;
    Ok(Json(BudgetView {
        id: budget.id,
        category_id: budget.category_id,
        year: budget.year,
        month: budget.month,
        amount_minor: budget.amount_minor,
        updated_at: budget.updated_at,
    }))
}

pub async fn list(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
    QueryParams(query): QueryParams<BudgetMonthQuery>,
) -> Result<Json<BudgetList>, ServerError> {
    let budgets = state
        .engine
        .budgets_for_month(access.workspace_id, query.year, query.month)
        .await?
        .into_iter()
        .map(|status| BudgetStatusView {
            category_id: status.category_id,
            year: status.year,
            month: status.month,
            amount_minor: status.amount_minor,
            spent_minor: status.spent_minor,
            remaining_minor: status.remaining_minor,
            is_over: status.is_over,
        })
        .collect();
    Ok(Json(BudgetList { budgets }))
}
