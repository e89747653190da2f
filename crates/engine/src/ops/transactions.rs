//! Ledger transactions.
//!
//! Callers are expected to have authorized the workspace already; nothing
//! here looks at memberships.

use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Transaction, TransactionKind, transactions,
    util::normalize_currency,
};

use super::{Engine, normalize_optional_text};

const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_LIST_LIMIT: u64 = 200;

/// Input for [`Engine::create_transaction`].
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount_minor: i64,
    /// Falls back to the workspace default currency when absent or blank.
    pub currency: Option<String>,
    /// Must name a category of the same workspace and kind.
    pub category_id: Option<Uuid>,
    pub note: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Filters for listing transactions and for the analytics queries.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub kind: Option<TransactionKind>,
    /// Listing matches any currency when unset; analytics fall back to the
    /// workspace default.
    pub currency: Option<String>,
    pub category_id: Option<Uuid>,
    pub limit: Option<u64>,
}

pub(super) fn validate_filter(filter: &TransactionFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.limit == Some(0) {
        return Err(EngineError::Validation("limit must be > 0".to_string()));
    }
    Ok(())
}

pub(super) trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, workspace_id: Uuid, filter: &TransactionFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, workspace_id: Uuid, filter: &TransactionFilter) -> Self {
        self = self.filter(transactions::Column::WorkspaceId.eq(workspace_id));
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredAt.lt(to));
        }
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(currency) = &filter.currency {
            self = self.filter(transactions::Column::Currency.eq(currency.as_str()));
        }
        if let Some(category_id) = filter.category_id {
            self = self.filter(transactions::Column::CategoryId.eq(category_id));
        }
        self
    }
}

impl Engine {
    pub async fn create_transaction(
        &self,
        workspace_id: Uuid,
        created_by: Uuid,
        input: NewTransaction,
    ) -> ResultEngine<Transaction> {
        let workspace = self.get_workspace(workspace_id).await?;
        let currency = match input.currency.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => normalize_currency(code)?,
            _ => workspace.default_currency,
        };

        if let Some(category_id) = input.category_id {
            let category = self.category(workspace_id, category_id).await?;
            if category.kind != input.kind {
                return Err(EngineError::Validation(format!(
                    "category \"{}\" is for {}, not {}",
                    category.name,
                    category.kind.as_str(),
                    input.kind.as_str()
                )));
            }
        }

        let tx = Transaction::new(
            workspace_id,
            input.kind,
            input.amount_minor,
            currency,
            input.category_id,
            normalize_optional_text(input.note.as_deref()),
            input.occurred_at.unwrap_or_else(Utc::now),
            created_by,
        )?;
        transactions::ActiveModel::from(&tx)
            .insert(&self.database)
            .await?;

        tracing::debug!(transaction_id = %tx.id, %workspace_id, "transaction created");
        Ok(tx)
    }

    /// Transactions newest first, capped at 200 per call.
    pub async fn list_transactions(
        &self,
        workspace_id: Uuid,
        filter: &TransactionFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        validate_filter(filter)?;
        let filter = TransactionFilter {
            currency: filter
                .currency
                .as_deref()
                .map(normalize_currency)
                .transpose()?,
            ..filter.clone()
        };
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .min(MAX_LIST_LIMIT);

        transactions::Entity::find()
            .apply_tx_filters(workspace_id, &filter)
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn filter_rejects_inverted_range() {
        let now = Utc::now();
        let filter = TransactionFilter {
            from: Some(now),
            to: Some(now - Duration::days(1)),
            ..Default::default()
        };
        assert!(matches!(
            validate_filter(&filter),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn filter_rejects_zero_limit() {
        let filter = TransactionFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert!(validate_filter(&filter).is_err());
        assert!(validate_filter(&TransactionFilter::default()).is_ok());
    }
}
