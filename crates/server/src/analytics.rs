//! Read-only aggregates; every route here sits behind the `viewer` gate.

use axum::{Extension, Json, extract::State};

use api_types::analytics::{
    AnalyticsQuery, CategoryBreakdown, CategoryTotalView, Summary, Timeseries, TimeseriesPoint,
};
use engine::{Bucket, TransactionFilter, TransactionKind};

use crate::{ServerError, WorkspaceAccess, extract::QueryParams, server::ServerState};

fn filter_from_query(query: &AnalyticsQuery) -> TransactionFilter {
    TransactionFilter {
        from: query.from,
        to: query.to,
        currency: query.currency.clone(),
        ..Default::default()
    }
}

/// `kind` of the breakdown and the time series, `expense` when omitted.
fn kind_or_expense(query: &AnalyticsQuery) -> Result<TransactionKind, ServerError> {
    Ok(query
        .kind
        .as_deref()
        .map(TransactionKind::try_from)
        .transpose()?
        .unwrap_or(TransactionKind::Expense))
}

pub async fn summary(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
    QueryParams(query): QueryParams<AnalyticsQuery>,
) -> Result<Json<Summary>, ServerError> {
    let filter = TransactionFilter {
        kind: query
            .kind
            .as_deref()
            .map(TransactionKind::try_from)
            .transpose()?,
        ..filter_from_query(&query)
    };
    let summary = state.engine.summary(access.workspace_id, &filter).await?;
    Ok(Json(Summary {
        currency: summary.currency,
        income_minor: summary.income_minor,
        expense_minor: summary.expense_minor,
        balance_minor: summary.balance_minor,
        count: summary.count,
    }))
}

pub async fn by_category(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
    QueryParams(query): QueryParams<AnalyticsQuery>,
) -> Result<Json<CategoryBreakdown>, ServerError> {
    let kind = kind_or_expense(&query)?;
    let breakdown = state
        .engine
        .by_category(access.workspace_id, kind, &filter_from_query(&query), query.top)
        .await?;

    Ok(Json(CategoryBreakdown {
        currency: breakdown.currency,
        kind: breakdown.kind.as_str().to_string(),
        total_minor: breakdown.total_minor,
        items: breakdown
            .items
            .into_iter()
            .map(|item| CategoryTotalView {
                category_id: item.category_id,
                name: item.name,
                total_minor: item.total_minor,
                count: item.count,
                share: item.share,
            })
            .collect(),
    }))
}

pub async fn timeseries(
    Extension(access): Extension<WorkspaceAccess>,
    State(state): State<ServerState>,
    QueryParams(query): QueryParams<AnalyticsQuery>,
) -> Result<Json<Timeseries>, ServerError> {
    let kind = kind_or_expense(&query)?;
    let bucket = query
        .bucket
        .as_deref()
        .map(Bucket::try_from)
        .transpose()?
        .unwrap_or(Bucket::Month);
    let series = state
        .engine
        .timeseries(access.workspace_id, kind, bucket, &filter_from_query(&query))
        .await?;

    Ok(Json(Timeseries {
        currency: series.currency,
        kind: series.kind.as_str().to_string(),
        bucket: series.bucket.as_str().to_string(),
        points: series
            .points
            .into_iter()
            .map(|point| TimeseriesPoint {
                period_start: point.period_start,
                total_minor: point.total_minor,
            })
            .collect(),
    }))
}
