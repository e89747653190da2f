//! Workspace service: input normalization and role parsing in front of the
//! store. Authorization is not checked here; callers arrive through the HTTP
//! role gate or are trusted tooling.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    Engine, MemberInfo, ResultEngine, Role, Workspace, WorkspaceListItem, util::normalize_email,
};

#[derive(Clone, Debug)]
pub struct WorkspaceService {
    engine: Arc<Engine>,
}

impl WorkspaceService {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Create a workspace owned by `creator_id`. Returns the creator's role
    /// alongside, which is always `owner`.
    pub async fn create_workspace(
        &self,
        creator_id: Uuid,
        name: &str,
        currency: Option<&str>,
    ) -> ResultEngine<(Workspace, Role)> {
        let workspace = self
            .engine
            .create_workspace_with_owner(creator_id, name, currency.unwrap_or_default())
            .await?;
        Ok((workspace, Role::Owner))
    }

    pub async fn list_my_workspaces(&self, user_id: Uuid) -> ResultEngine<Vec<WorkspaceListItem>> {
        self.engine.list_my_workspaces(user_id).await
    }

    pub async fn get_workspace(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<(Workspace, Role)> {
        self.engine.workspace_with_role(workspace_id, user_id).await
    }

    pub async fn list_members(&self, workspace_id: Uuid) -> ResultEngine<Vec<MemberInfo>> {
        self.engine.list_members_info(workspace_id).await
    }

    /// Invite an existing user by email.
    ///
    /// The role is parsed before any lookup, so a bad role never costs a
    /// query.
    pub async fn add_member_by_email(
        &self,
        workspace_id: Uuid,
        email: &str,
        role: &str,
    ) -> ResultEngine<Uuid> {
        let role = Role::try_from(role)?;
        let email = normalize_email(email);
        let user_id = self.engine.find_user_id_by_email(&email).await?;
        self.engine
            .add_member_by_user_id(workspace_id, user_id, role)
            .await?;
        Ok(user_id)
    }

    pub async fn update_member_role(
        &self,
        workspace_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
        role: &str,
    ) -> ResultEngine<()> {
        let role = Role::try_from(role)?;
        self.engine
            .update_member_role_safe(workspace_id, actor_id, target_id, role)
            .await
    }

    pub async fn remove_member(
        &self,
        workspace_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> ResultEngine<()> {
        self.engine
            .remove_member_safe(workspace_id, actor_id, target_id)
            .await
    }
}
