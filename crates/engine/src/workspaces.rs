//! A `Workspace` is a shared ledger: the tenancy boundary for transactions
//! and the unit that memberships grant access to.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Role;

/// Currency used when a workspace is created without one.
pub const DEFAULT_CURRENCY: &str = "UAH";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub default_currency: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(name: String, default_currency: String, created_by: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            default_currency,
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// A workspace as seen by one of its members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceListItem {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "workspaces")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub default_currency: String,
    pub created_by: Uuid,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::workspace_members::Entity")]
    Members,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::workspace_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Workspace> for ActiveModel {
    fn from(value: &Workspace) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            name: ActiveValue::Set(value.name.clone()),
            default_currency: ActiveValue::Set(value.default_currency.clone()),
            created_by: ActiveValue::Set(value.created_by),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl From<Model> for Workspace {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            default_currency: model.default_currency,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}
