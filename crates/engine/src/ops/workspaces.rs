use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Role, Workspace, WorkspaceListItem,
    util::{is_foreign_key_violation, normalize_currency},
    workspace_members, workspaces,
};

use super::{Engine, normalize_required_name, with_tx};

impl Engine {
    /// Create a workspace and its creator's `owner` membership atomically.
    ///
    /// Both rows are written in one DB transaction: a workspace without
    /// members is never observable. A creator without a user row fails the
    /// membership insert, which rolls the workspace row back.
    pub async fn create_workspace_with_owner(
        &self,
        creator_id: Uuid,
        name: &str,
        currency: &str,
    ) -> ResultEngine<Workspace> {
        let name = normalize_required_name(name, "workspace")?;
        let currency = normalize_currency(currency)?;

        let workspace = Workspace::new(name, currency, creator_id);
        let workspace_model: workspaces::ActiveModel = (&workspace).into();
        let owner = workspace_members::ActiveModel {
            workspace_id: ActiveValue::Set(workspace.id),
            user_id: ActiveValue::Set(creator_id),
            role: ActiveValue::Set(Role::Owner.as_str().to_string()),
            created_at: ActiveValue::Set(workspace.created_at),
        };

        with_tx!(self, |db_tx| {
            workspace_model.insert(&db_tx).await?;
            match owner.insert(&db_tx).await {
                Ok(_) => Ok(()),
                Err(err) if is_foreign_key_violation(&err) => Err(EngineError::UserNotFound),
                Err(err) => Err(err.into()),
            }
        })?;

        tracing::info!(
            workspace_id = %workspace.id,
            created_by = %creator_id,
            "workspace created"
        );
        Ok(workspace)
    }

    pub async fn get_workspace(&self, workspace_id: Uuid) -> ResultEngine<Workspace> {
        workspaces::Entity::find_by_id(workspace_id)
            .one(&self.database)
            .await?
            .map(Workspace::from)
            .ok_or_else(|| EngineError::KeyNotFound("workspace".to_string()))
    }

    pub async fn workspace_exists(&self, workspace_id: Uuid) -> ResultEngine<bool> {
        Ok(workspaces::Entity::find_by_id(workspace_id)
            .one(&self.database)
            .await?
            .is_some())
    }

    /// Fetch a workspace together with the caller's role in it.
    ///
    /// Non-members get `KeyNotFound`, the same as a missing workspace.
    pub async fn workspace_with_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<(Workspace, Role)> {
        let Some((membership, Some(workspace))) =
            workspace_members::Entity::find_by_id((workspace_id, user_id))
                .find_also_related(workspaces::Entity)
                .one(&self.database)
                .await?
        else {
            return Err(EngineError::KeyNotFound("workspace".to_string()));
        };
        Ok((workspace.into(), membership.role()?))
    }

    /// Workspaces the user belongs to, newest first.
    pub async fn list_my_workspaces(&self, user_id: Uuid) -> ResultEngine<Vec<WorkspaceListItem>> {
        let rows = workspace_members::Entity::find()
            .filter(workspace_members::Column::UserId.eq(user_id))
            .find_also_related(workspaces::Entity)
            .order_by_desc(workspaces::Column::CreatedAt)
            .all(&self.database)
            .await?;

        rows.into_iter()
            .filter_map(|(membership, workspace)| workspace.map(|w| (membership, w)))
            .map(|(membership, workspace)| {
                Ok(WorkspaceListItem {
                    id: workspace.id,
                    name: workspace.name,
                    role: membership.role()?,
                    created_at: workspace.created_at,
                })
            })
            .collect()
    }
}
