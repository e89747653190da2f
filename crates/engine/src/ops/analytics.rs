//! Aggregates over a workspace ledger.
//!
//! Every figure is in a single currency: the requested one, or the
//! workspace default when none is given. Sums are computed by the database
//! as `bigint`; a sum that does not fit fails the query instead of wrapping.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, Duration, Months, NaiveDate};
use sea_orm::{
    DbBackend, QuerySelect,
    prelude::*,
    sea_query::{Alias, Expr, SimpleExpr},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, TransactionKind, transactions, util::normalize_currency};

use super::{
    Engine,
    transactions::{ApplyTxFilters, TransactionFilter, validate_filter},
};

const MAX_TOP: u64 = 100;
const MAX_TIMESERIES_DAYS: i64 = 3660;
const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub currency: String,
    pub income_minor: i64,
    pub expense_minor: i64,
    pub balance_minor: i64,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// `None` groups transactions without a category.
    pub category_id: Option<Uuid>,
    pub name: String,
    pub total_minor: i64,
    pub count: u64,
    /// Fraction of the breakdown total, in `[0, 1]`.
    pub share: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub currency: String,
    pub kind: TransactionKind,
    pub total_minor: i64,
    pub items: Vec<CategoryTotal>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Day,
    /// ISO weeks, starting on Monday.
    Week,
    Month,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    fn start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            Self::Month => date.with_day(1).unwrap_or(date),
        }
    }

    fn next(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Day => start.succ_opt(),
            Self::Week => start.checked_add_days(Days::new(7)),
            Self::Month => start.checked_add_months(Months::new(1)),
        }
    }
}

impl TryFrom<&str> for Bucket {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(EngineError::Validation(format!(
                "invalid bucket: {other} (expected day, week or month)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeseriesPoint {
    pub period_start: NaiveDate,
    pub total_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeseries {
    pub currency: String,
    pub kind: TransactionKind,
    pub bucket: Bucket,
    /// One point per bucket from `from` to `to`, empty buckets included.
    pub points: Vec<TimeseriesPoint>,
}

fn sum_minor() -> SimpleExpr {
    Expr::col(transactions::Column::AmountMinor)
        .sum()
        .cast_as(Alias::new("bigint"))
}

fn row_count() -> SimpleExpr {
    Expr::col(transactions::Column::Id).count()
}

/// UTC calendar day of `occurred_at` as `YYYY-MM-DD`.
fn occurred_day(backend: DbBackend) -> SimpleExpr {
    match backend {
        DbBackend::Postgres => Expr::cust("to_char(occurred_at AT TIME ZONE 'UTC', 'YYYY-MM-DD')"),
        DbBackend::MySql => Expr::cust("DATE_FORMAT(occurred_at, '%Y-%m-%d')"),
        DbBackend::Sqlite => Expr::cust("substr(occurred_at, 1, 10)"),
    }
}

fn to_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

fn overflow(what: &str) -> EngineError {
    EngineError::Internal(format!("{what} does not fit in i64"))
}

impl Engine {
    /// Pin the filter to one currency and drop the list limit.
    async fn analytics_scope(
        &self,
        workspace_id: Uuid,
        filter: &TransactionFilter,
        kind: Option<TransactionKind>,
    ) -> ResultEngine<TransactionFilter> {
        validate_filter(filter)?;
        let currency = match filter.currency.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => normalize_currency(code)?,
            _ => self.get_workspace(workspace_id).await?.default_currency,
        };
        Ok(TransactionFilter {
            currency: Some(currency),
            kind: kind.or(filter.kind),
            limit: None,
            ..filter.clone()
        })
    }

    /// Income and expense totals over the filtered range. `limit` is ignored.
    pub async fn summary(
        &self,
        workspace_id: Uuid,
        filter: &TransactionFilter,
    ) -> ResultEngine<Summary> {
        let scope = self.analytics_scope(workspace_id, filter, None).await?;

        let rows: Vec<(String, i64, i64)> = transactions::Entity::find()
            .apply_tx_filters(workspace_id, &scope)
            .select_only()
            .column(transactions::Column::Kind)
            .column_as(sum_minor(), "total_minor")
            .column_as(row_count(), "count")
            .group_by(transactions::Column::Kind)
            .into_tuple()
            .all(&self.database)
            .await?;

        let mut summary = Summary {
            currency: scope.currency.unwrap_or_default(),
            ..Default::default()
        };
        for (kind, total_minor, count) in rows {
            match TransactionKind::try_from(kind.as_str())? {
                TransactionKind::Income => summary.income_minor = total_minor,
                TransactionKind::Expense => summary.expense_minor = total_minor,
            }
            summary.count += to_count(count);
        }
        summary.balance_minor = summary
            .income_minor
            .checked_sub(summary.expense_minor)
            .ok_or_else(|| overflow("balance"))?;
        Ok(summary)
    }

    /// Totals of one kind grouped by category, largest first.
    ///
    /// `top` keeps only the first `1..=100` groups; shares are always taken
    /// against the total of every group.
    pub async fn by_category(
        &self,
        workspace_id: Uuid,
        kind: TransactionKind,
        filter: &TransactionFilter,
        top: Option<u64>,
    ) -> ResultEngine<CategoryBreakdown> {
        if let Some(top) = top
            && !(1..=MAX_TOP).contains(&top)
        {
            return Err(EngineError::Validation(format!(
                "top must be between 1 and {MAX_TOP}"
            )));
        }
        let scope = self.analytics_scope(workspace_id, filter, Some(kind)).await?;

        let rows: Vec<(Option<Uuid>, i64, i64)> = transactions::Entity::find()
            .apply_tx_filters(workspace_id, &scope)
            .select_only()
            .column(transactions::Column::CategoryId)
            .column_as(sum_minor(), "total_minor")
            .column_as(row_count(), "count")
            .group_by(transactions::Column::CategoryId)
            .into_tuple()
            .all(&self.database)
            .await?;

        let names: HashMap<Uuid, String> = self
            .list_categories(workspace_id)
            .await?
            .into_iter()
            .map(|category| (category.id, category.name))
            .collect();

        let total_minor = rows
            .iter()
            .try_fold(0i64, |acc, (_, total, _)| acc.checked_add(*total))
            .ok_or_else(|| overflow("category total"))?;

        let mut items: Vec<CategoryTotal> = rows
            .into_iter()
            .map(|(category_id, total, count)| CategoryTotal {
                category_id,
                name: category_id
                    .and_then(|id| names.get(&id).cloned())
                    .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                total_minor: total,
                count: to_count(count),
                share: if total_minor > 0 {
                    total as f64 / total_minor as f64
                } else {
                    0.0
                },
            })
            .collect();
        items.sort_by(|a, b| {
            b.total_minor
                .cmp(&a.total_minor)
                .then_with(|| a.name.cmp(&b.name))
        });
        if let Some(top) = top {
            items.truncate(usize::try_from(top).unwrap_or(usize::MAX));
        }

        Ok(CategoryBreakdown {
            currency: scope.currency.unwrap_or_default(),
            kind,
            total_minor,
            items,
        })
    }

    /// Totals of one kind per day, week or month over `[from, to)`.
    ///
    /// Both ends are required and the range may span at most ten years.
    pub async fn timeseries(
        &self,
        workspace_id: Uuid,
        kind: TransactionKind,
        bucket: Bucket,
        filter: &TransactionFilter,
    ) -> ResultEngine<Timeseries> {
        let (Some(from), Some(to)) = (filter.from, filter.to) else {
            return Err(EngineError::Validation(
                "timeseries needs both from and to".to_string(),
            ));
        };
        let scope = self.analytics_scope(workspace_id, filter, Some(kind)).await?;
        if to - from > Duration::days(MAX_TIMESERIES_DAYS) {
            return Err(EngineError::Validation(format!(
                "timeseries range must not exceed {MAX_TIMESERIES_DAYS} days"
            )));
        }

        let day = occurred_day(self.database.get_database_backend());
        let rows: Vec<(String, i64)> = transactions::Entity::find()
            .apply_tx_filters(workspace_id, &scope)
            .select_only()
            .column_as(day.clone(), "day")
            .column_as(sum_minor(), "total_minor")
            .group_by(day)
            .into_tuple()
            .all(&self.database)
            .await?;

        let mut totals: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for (day, total) in rows {
            let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .map_err(|err| EngineError::Internal(format!("bucket day {day:?}: {err}")))?;
            let slot = totals.entry(bucket.start(date)).or_default();
            *slot = slot
                .checked_add(total)
                .ok_or_else(|| overflow("bucket total"))?;
        }

        let last = bucket.start((to - Duration::nanoseconds(1)).date_naive());
        let mut points = Vec::new();
        let mut cursor = Some(bucket.start(from.date_naive()));
        while let Some(start) = cursor
            && start <= last
        {
            points.push(TimeseriesPoint {
                period_start: start,
                total_minor: totals.get(&start).copied().unwrap_or_default(),
            });
            cursor = bucket.next(start);
        }

        Ok(Timeseries {
            currency: scope.currency.unwrap_or_default(),
            kind,
            bucket,
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weeks_start_on_monday() {
        // 2026-03-04 is a Wednesday.
        assert_eq!(Bucket::Week.start(date(2026, 3, 4)), date(2026, 3, 2));
        assert_eq!(Bucket::Week.start(date(2026, 3, 2)), date(2026, 3, 2));
        assert_eq!(Bucket::Week.start(date(2026, 3, 8)), date(2026, 3, 2));
    }

    #[test]
    fn months_roll_over_the_year() {
        assert_eq!(Bucket::Month.start(date(2026, 12, 31)), date(2026, 12, 1));
        assert_eq!(Bucket::Month.next(date(2026, 12, 1)), Some(date(2027, 1, 1)));
        assert_eq!(Bucket::Day.next(date(2026, 2, 28)), Some(date(2026, 3, 1)));
    }

    #[test]
    fn bucket_parsing() {
        assert_eq!(Bucket::try_from(" week ").unwrap(), Bucket::Week);
        assert!(matches!(
            Bucket::try_from("year"),
            Err(EngineError::Validation(_))
        ));
    }
}
