use sea_orm::{ConnectionTrait, DatabaseConnection};

use crate::{EngineError, ResultEngine};

mod analytics;
mod budgets;
mod categories;
mod memberships;
mod sessions;
mod transactions;
mod users;
mod workspaces;

pub use analytics::{Bucket, CategoryBreakdown, CategoryTotal, Summary, Timeseries, TimeseriesPoint};
pub use budgets::BudgetInput;
pub use transactions::{NewTransaction, TransactionFilter};

/// Run a block inside a DB transaction, committing on success.
///
/// Any early exit (`?`, `return`, error value, or the caller dropping the
/// future) drops the `DatabaseTransaction` uncommitted, which rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = sea_orm::TransactionTrait::begin(&$self.database).await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Persistence and domain rules for workspaces, memberships, users,
/// sessions, categories, budgets and ledger transactions.
#[derive(Clone, Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Round-trip to the database; backs the `/ready` check.
    pub async fn ping(&self) -> ResultEngine<()> {
        self.database
            .execute_unprepared("SELECT 1")
            .await
            .map(|_| ())
            .map_err(Into::into)
    }
}

fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
