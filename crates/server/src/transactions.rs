use axum::{Extension, Json, extract::State, http::StatusCode};

use api_types::transaction::{
    TransactionCreated, TransactionList, TransactionNew, TransactionQuery, TransactionView,
};
use engine::{NewTransaction, TransactionFilter, TransactionKind};

use crate::{
    ServerError, WorkspaceAccess,
    extract::{JsonBody, QueryParams},
    server::ServerState,
};

fn filter_from_query(query: TransactionQuery) -> Result<TransactionFilter, ServerError> {
    let kind = query
        .kind
        .as_deref()
        .map(TransactionKind::try_from)
        .transpose()?;
    Ok(TransactionFilter {
        from: query.from,
        to: query.to,
        kind,
        currency: query.currency,
        category_id: query.category_id,
        limit: query.limit,
    })
}

pub async fn create(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let input = NewTransaction {
        kind: TransactionKind::try_from(payload.kind.as_str())?,
        amount_minor: payload.amount_minor,
        currency: payload.currency,
        category_id: payload.category_id,
        note: payload.note,
        occurred_at: payload.occurred_at,
    };
    let tx = state
        .engine
        .create_transaction(access.workspace_id, access.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(TransactionCreated { id: tx.id })))
}

pub async fn list(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
    QueryParams(query): QueryParams<TransactionQuery>,
) -> Result<Json<TransactionList>, ServerError> {
    let filter = filter_from_query(query)?;
    let transactions = state
        .engine
        .list_transactions(access.workspace_id, &filter)
        .await?
        .into_iter()
        .map(|tx| TransactionView {
            id: tx.id,
            kind: tx.kind.as_str().to_string(),
            amount_minor: tx.amount_minor,
            currency: tx.currency,
            category_id: tx.category_id,
            note: tx.note,
            occurred_at: tx.occurred_at,
            created_by: tx.created_by,
            created_at: tx.created_at,
        })
        .collect();

    Ok(Json(TransactionList { transactions }))
}
