use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod auth {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Register {
        pub email: String,
        pub password: String,
        pub name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        pub email: String,
        pub password: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub email: String,
        pub name: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    /// Issued on register and login. Send `token` back as
    /// `Authorization: Bearer <token>`; trade `refresh_token` for a new pair
    /// at `/auth/refresh` once it expires.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TokenResponse {
        pub token: String,
        pub refresh_token: String,
        pub user: UserView,
    }

    /// Body of `/auth/refresh` and `/auth/logout`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RefreshRequest {
        pub refresh_token: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RefreshResponse {
        pub token: String,
        pub refresh_token: String,
    }
}

pub mod membership {
    use super::*;

    /// Role of a user in a workspace.
    ///
    /// The server treats roles as ranked tiers:
    /// - `owner`: full access and can manage members.
    /// - `member`: can record transactions but cannot manage members.
    /// - `viewer`: read-only.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MembershipRole {
        Owner,
        Member,
        Viewer,
    }

    impl MembershipRole {
        /// Returns the canonical role string used by the engine/database.
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Owner => "owner",
                Self::Member => "member",
                Self::Viewer => "viewer",
            }
        }
    }

    /// Roles travel as plain strings on input so the server can report
    /// unknown values with its own error body.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberAdd {
        pub email: String,
        pub role: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberRoleUpdate {
        pub role: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberAdded {
        pub user_id: Uuid,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MemberView {
        pub user_id: Uuid,
        pub email: String,
        pub name: Option<String>,
        pub role: MembershipRole,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberList {
        pub members: Vec<MemberView>,
    }
}

pub mod workspace {
    use super::*;
    use crate::membership::MembershipRole;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WorkspaceNew {
        pub name: String,
        /// ISO 4217 code; the server default applies when omitted.
        pub currency: Option<String>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct WorkspaceView {
        pub id: Uuid,
        pub name: String,
        pub default_currency: String,
        pub created_by: Uuid,
        pub created_at: DateTime<Utc>,
    }

    /// A workspace together with the caller's role in it.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct WorkspaceWithRole {
        pub workspace: WorkspaceView,
        pub role: MembershipRole,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WorkspaceListItem {
        pub id: Uuid,
        pub name: String,
        pub role: MembershipRole,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WorkspaceList {
        pub workspaces: Vec<WorkspaceListItem>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        /// `income` or `expense`.
        pub kind: String,
        pub amount_minor: i64,
        pub currency: Option<String>,
        pub category_id: Option<Uuid>,
        pub note: Option<String>,
        /// Defaults to now.
        pub occurred_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionCreated {
        pub id: Uuid,
    }

    /// Query string for listing.
    ///
    /// `from` is inclusive and `to` is exclusive.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionQuery {
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
        pub kind: Option<String>,
        pub currency: Option<String>,
        pub category_id: Option<Uuid>,
        pub limit: Option<u64>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: String,
        pub amount_minor: i64,
        pub currency: String,
        pub category_id: Option<Uuid>,
        pub note: Option<String>,
        pub occurred_at: DateTime<Utc>,
        pub created_by: Uuid,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionList {
        pub transactions: Vec<TransactionView>,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        /// `income` or `expense`.
        pub kind: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub kind: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryList {
        pub categories: Vec<CategoryView>,
    }
}

pub mod budget {
    use super::*;

    /// Sets the limit of an expense category for one month.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetUpsert {
        pub category_id: Uuid,
        pub year: i32,
        pub month: u32,
        pub amount_minor: i64,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub category_id: Uuid,
        pub year: i32,
        pub month: u32,
        pub amount_minor: i64,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetMonthQuery {
        pub year: i32,
        pub month: u32,
    }

    /// Spending is counted in the workspace default currency.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BudgetStatusView {
        pub category_id: Uuid,
        pub year: i32,
        pub month: u32,
        pub amount_minor: i64,
        pub spent_minor: i64,
        pub remaining_minor: i64,
        pub is_over: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetList {
        pub budgets: Vec<BudgetStatusView>,
    }
}

pub mod analytics {
    use chrono::NaiveDate;

    use super::*;

    /// Query string shared by the analytics endpoints.
    ///
    /// `currency` defaults to the workspace currency. `kind` defaults to
    /// `expense` for the breakdown and the time series; `bucket` defaults to
    /// `month`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AnalyticsQuery {
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
        pub currency: Option<String>,
        pub kind: Option<String>,
        pub bucket: Option<String>,
        pub top: Option<u64>,
    }

    #[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Summary {
        pub currency: String,
        pub income_minor: i64,
        pub expense_minor: i64,
        pub balance_minor: i64,
        pub count: u64,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct CategoryTotalView {
        pub category_id: Option<Uuid>,
        pub name: String,
        pub total_minor: i64,
        pub count: u64,
        pub share: f64,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct CategoryBreakdown {
        pub currency: String,
        pub kind: String,
        pub total_minor: i64,
        pub items: Vec<CategoryTotalView>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TimeseriesPoint {
        pub period_start: NaiveDate,
        pub total_minor: i64,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Timeseries {
        pub currency: String,
        pub kind: String,
        pub bucket: String,
        pub points: Vec<TimeseriesPoint>,
    }
}

pub mod health {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Health {
        pub status: String,
        pub version: String,
        pub started_at: DateTime<Utc>,
        pub uptime_seconds: i64,
    }
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
}
