//! Domain and persistence layer for FinTrack.
//!
//! [`Engine`] owns the database handle and exposes the workspace store, the
//! guarded membership protocol, identities with their refresh tokens, and the
//! ledger: categories, transactions, monthly budgets and analytics.
//! [`WorkspaceService`] sits in front of it for request-facing input handling.

pub use budgets::{Budget, BudgetStatus};
pub use categories::Category;
pub use error::EngineError;
pub use ops::{
    BudgetInput, Bucket, CategoryBreakdown, CategoryTotal, Engine, EngineBuilder, NewTransaction,
    Summary, Timeseries, TimeseriesPoint, TransactionFilter,
};
pub use roles::{Role, role_at_least};
pub use service::WorkspaceService;
pub use transactions::{MAX_AMOUNT_MINOR, Transaction, TransactionKind};
pub use users::User;
pub use util::parse_uuid;
pub use workspace_members::{Member, MemberInfo};
pub use workspaces::{DEFAULT_CURRENCY, Workspace, WorkspaceListItem};

mod budgets;
mod categories;
mod error;
mod ops;
mod refresh_tokens;
mod roles;
mod service;
mod transactions;
mod users;
mod util;
mod workspace_members;
mod workspaces;

type ResultEngine<T> = Result<T, EngineError>;
