//! Monthly budgets per expense category.
//!
//! Spending is measured in the workspace default currency; transactions in
//! other currencies never count against a budget.

use std::collections::HashMap;

use chrono::{DateTime, Months, NaiveDate, Utc};
use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, QuerySelect,
    prelude::*,
    sea_query::{Alias, Expr, OnConflict},
};
use uuid::Uuid;

use crate::{
    Budget, BudgetStatus, EngineError, ResultEngine, TransactionKind, budgets, transactions,
};

use super::{Engine, with_tx};

const MIN_YEAR: i32 = 2025;
const MAX_YEAR: i32 = 2100;

/// Input for [`Engine::upsert_budget`].
#[derive(Clone, Copy, Debug)]
pub struct BudgetInput {
    pub category_id: Uuid,
    pub year: i32,
    pub month: u32,
    pub amount_minor: i64,
}

/// `[start, end)` of a calendar month in UTC.
fn month_range(year: i32, month: u32) -> ResultEngine<(DateTime<Utc>, DateTime<Utc>)> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(EngineError::Validation(format!(
            "year must be between {MIN_YEAR} and {MAX_YEAR}"
        )));
    }
    if !(1..=12).contains(&month) {
        return Err(EngineError::Validation(
            "month must be between 1 and 12".to_string(),
        ));
    }
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::Validation(format!("invalid month {year}-{month}")))?;
    let end = start
        .checked_add_months(Months::new(1))
        .ok_or_else(|| EngineError::Validation(format!("invalid month {year}-{month}")))?;
    Ok((
        start.and_time(Default::default()).and_utc(),
        end.and_time(Default::default()).and_utc(),
    ))
}

impl Engine {
    /// Set the budget of an expense category for one month, replacing any
    /// earlier amount.
    pub async fn upsert_budget(
        &self,
        workspace_id: Uuid,
        input: BudgetInput,
    ) -> ResultEngine<Budget> {
        month_range(input.year, input.month)?;
        if input.amount_minor < 0 {
            return Err(EngineError::Validation(
                "amount_minor must be >= 0".to_string(),
            ));
        }
        let category = self.category(workspace_id, input.category_id).await?;
        if category.kind != TransactionKind::Expense {
            return Err(EngineError::Validation(
                "category is not expense".to_string(),
            ));
        }

        let now = Utc::now();
        let month = i32::try_from(input.month).unwrap_or_default();
        let budget = with_tx!(self, |db_tx| {
            let active = budgets::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                workspace_id: ActiveValue::Set(workspace_id),
                category_id: ActiveValue::Set(input.category_id),
                year: ActiveValue::Set(input.year),
                month: ActiveValue::Set(month),
                amount_minor: ActiveValue::Set(input.amount_minor),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            };
            budgets::Entity::insert(active)
                .on_conflict(
                    OnConflict::columns([
                        budgets::Column::WorkspaceId,
                        budgets::Column::CategoryId,
                        budgets::Column::Year,
                        budgets::Column::Month,
                    ])
                    .update_columns([budgets::Column::AmountMinor, budgets::Column::UpdatedAt])
                    .to_owned(),
                )
                .exec_without_returning(&db_tx)
                .await?;

            budgets::Entity::find()
                .filter(budgets::Column::WorkspaceId.eq(workspace_id))
                .filter(budgets::Column::CategoryId.eq(input.category_id))
                .filter(budgets::Column::Year.eq(input.year))
                .filter(budgets::Column::Month.eq(month))
                .one(&db_tx)
                .await?
                .map(Budget::from)
                .ok_or_else(|| EngineError::Internal("budget vanished after upsert".to_string()))
        })?;

        tracing::debug!(
            budget_id = %budget.id,
            %workspace_id,
            year = budget.year,
            month = budget.month,
            "budget set"
        );
        Ok(budget)
    }

    /// Budgets of one month with what was spent against each.
    pub async fn budgets_for_month(
        &self,
        workspace_id: Uuid,
        year: i32,
        month: u32,
    ) -> ResultEngine<Vec<BudgetStatus>> {
        let (start, end) = month_range(year, month)?;
        let workspace = self.get_workspace(workspace_id).await?;

        let rows = budgets::Entity::find()
            .filter(budgets::Column::WorkspaceId.eq(workspace_id))
            .filter(budgets::Column::Year.eq(year))
            .filter(budgets::Column::Month.eq(i32::try_from(month).unwrap_or_default()))
            .order_by_asc(budgets::Column::CategoryId)
            .all(&self.database)
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let spent: HashMap<Option<Uuid>, i64> = transactions::Entity::find()
            .filter(transactions::Column::WorkspaceId.eq(workspace_id))
            .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
            .filter(transactions::Column::Currency.eq(workspace.default_currency.as_str()))
            .filter(transactions::Column::OccurredAt.gte(start))
            .filter(transactions::Column::OccurredAt.lt(end))
            .filter(transactions::Column::CategoryId.is_not_null())
            .select_only()
            .column(transactions::Column::CategoryId)
            .column_as(
                Expr::col(transactions::Column::AmountMinor)
                    .sum()
                    .cast_as(Alias::new("bigint")),
                "spent_minor",
            )
            .group_by(transactions::Column::CategoryId)
            .into_tuple::<(Option<Uuid>, i64)>()
            .all(&self.database)
            .await?
            .into_iter()
            .collect();

        rows.into_iter()
            .map(Budget::from)
            .map(|budget| -> ResultEngine<BudgetStatus> {
                let spent_minor = spent.get(&Some(budget.category_id)).copied().unwrap_or(0);
                let remaining_minor = budget
                    .amount_minor
                    .checked_sub(spent_minor)
                    .ok_or_else(|| {
                        EngineError::Internal("remaining budget does not fit in i64".to_string())
                    })?;
                Ok(BudgetStatus {
                    category_id: budget.category_id,
                    year: budget.year,
                    month: budget.month,
                    amount_minor: budget.amount_minor,
                    spent_minor,
                    remaining_minor,
                    is_over: spent_minor > budget.amount_minor,
                })
            })
            .collect()
    }
}
