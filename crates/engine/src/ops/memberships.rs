//! Membership store and the guarded role-mutation protocol.
//!
//! Role updates and removals run as one DB transaction:
//!
//! 1. lock every membership row of the workspace (ordered by `user_id`) and
//!    read the target's current role, `MemberNotFound` if absent;
//! 2. role update only: an owner may not demote themself (`CannotSelfDemote`);
//! 3. if the target is an owner and the operation drops that, at least one
//!    other owner must remain (`LastOwner`);
//! 4. write, `MemberNotFound` when no row was affected;
//! 5. commit. Every other exit rolls back.
//!
//! Locking the whole membership set in a fixed order gives the owner count
//! and the write the same snapshot, and two mutations of one workspace can
//! never deadlock on each other. Backends without row locks (SQLite) get the
//! same guarantee from their single-writer transactions.

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    EngineError, Member, MemberInfo, ResultEngine, Role, users,
    util::{is_foreign_key_violation, is_unique_violation},
    workspace_members, workspaces,
};

use super::{Engine, with_tx};

/// What a guarded mutation does to the target membership.
#[derive(Clone, Copy, Debug)]
enum Mutation {
    SetRole(Role),
    Remove,
}

impl Mutation {
    fn keeps_ownership(self) -> bool {
        matches!(self, Self::SetRole(Role::Owner))
    }
}

impl Engine {
    /// Role of `user_id` in `workspace_id`, `None` when there is no membership.
    ///
    /// A missing membership does not tell whether the workspace exists; pair
    /// it with [`Engine::workspace_exists`] when that matters.
    pub async fn user_role(&self, workspace_id: Uuid, user_id: Uuid) -> ResultEngine<Option<Role>> {
        workspace_members::Entity::find_by_id((workspace_id, user_id))
            .one(&self.database)
            .await?
            .map(|m| m.role())
            .transpose()
    }

    /// Memberships ordered by join time.
    pub async fn list_members(&self, workspace_id: Uuid) -> ResultEngine<Vec<Member>> {
        workspace_members::Entity::find()
            .filter(workspace_members::Column::WorkspaceId.eq(workspace_id))
            .order_by_asc(workspace_members::Column::CreatedAt)
            .order_by_asc(workspace_members::Column::UserId)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Member::try_from)
            .collect()
    }

    /// Memberships joined with user email and name, ordered by join time.
    pub async fn list_members_info(&self, workspace_id: Uuid) -> ResultEngine<Vec<MemberInfo>> {
        let rows = workspace_members::Entity::find()
            .filter(workspace_members::Column::WorkspaceId.eq(workspace_id))
            .find_also_related(users::Entity)
            .order_by_asc(workspace_members::Column::CreatedAt)
            .order_by_asc(workspace_members::Column::UserId)
            .all(&self.database)
            .await?;

        rows.into_iter()
            .filter_map(|(membership, user)| user.map(|u| (membership, u)))
            .map(|(membership, user)| {
                Ok(MemberInfo {
                    role: membership.role()?,
                    user_id: membership.user_id,
                    email: user.email,
                    name: user.name,
                    created_at: membership.created_at,
                })
            })
            .collect()
    }

    /// Insert a membership. An existing `(workspace, user)` pair is
    /// `AlreadyMember`, whether seen up front or reported by the constraint.
    /// The workspace is checked first, so a remaining foreign key failure
    /// can only be the user.
    pub async fn add_member_by_user_id(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            if workspaces::Entity::find_by_id(workspace_id)
                .one(&db_tx)
                .await?
                .is_none()
            {
                return Err(EngineError::KeyNotFound("workspace".to_string()));
            }

            let existing = workspace_members::Entity::find_by_id((workspace_id, user_id))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::AlreadyMember);
            }

            let active = workspace_members::ActiveModel {
                workspace_id: ActiveValue::Set(workspace_id),
                user_id: ActiveValue::Set(user_id),
                role: ActiveValue::Set(role.as_str().to_string()),
                created_at: ActiveValue::Set(Utc::now()),
            };
            match workspace_members::Entity::insert(active)
                .exec_without_returning(&db_tx)
                .await
            {
                Ok(_) => Ok(()),
                Err(err) if is_unique_violation(&err) => Err(EngineError::AlreadyMember),
                Err(err) if is_foreign_key_violation(&err) => Err(EngineError::UserNotFound),
                Err(err) => Err(err.into()),
            }
        })?;

        tracing::debug!(%workspace_id, %user_id, %role, "member added");
        Ok(())
    }

    /// Change a member's role under the self-demotion and last-owner guards.
    pub async fn update_member_role_safe(
        &self,
        workspace_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
        new_role: Role,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.guarded_mutation(
                &db_tx,
                workspace_id,
                actor_id,
                target_id,
                Mutation::SetRole(new_role),
            )
            .await
        })?;

        tracing::debug!(%workspace_id, %actor_id, %target_id, %new_role, "member role updated");
        Ok(())
    }

    /// Remove a member under the last-owner guard.
    ///
    /// Removing the last non-owner member is allowed; only owners are counted.
    pub async fn remove_member_safe(
        &self,
        workspace_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.guarded_mutation(&db_tx, workspace_id, actor_id, target_id, Mutation::Remove)
                .await
        })?;

        tracing::debug!(%workspace_id, %actor_id, %target_id, "member removed");
        Ok(())
    }

    async fn guarded_mutation(
        &self,
        db_tx: &DatabaseTransaction,
        workspace_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
        mutation: Mutation,
    ) -> ResultEngine<()> {
        let members = workspace_members::Entity::find()
            .filter(workspace_members::Column::WorkspaceId.eq(workspace_id))
            .order_by_asc(workspace_members::Column::UserId)
            .lock_exclusive()
            .all(db_tx)
            .await?;

        let target = members
            .iter()
            .find(|m| m.user_id == target_id)
            .ok_or(EngineError::MemberNotFound)?;
        let current = target.role()?;

        if current == Role::Owner && !mutation.keeps_ownership() {
            if matches!(mutation, Mutation::SetRole(_)) && actor_id == target_id {
                return Err(EngineError::CannotSelfDemote);
            }
            let owners = members.iter().filter(|m| m.is_owner()).count();
            if owners <= 1 {
                return Err(EngineError::LastOwner);
            }
        }

        let affected = match mutation {
            Mutation::SetRole(role) => {
                workspace_members::Entity::update_many()
                    .col_expr(
                        workspace_members::Column::Role,
                        Expr::value(role.as_str()),
                    )
                    .filter(workspace_members::Column::WorkspaceId.eq(workspace_id))
                    .filter(workspace_members::Column::UserId.eq(target_id))
                    .exec(db_tx)
                    .await?
                    .rows_affected
            }
            Mutation::Remove => {
                workspace_members::Entity::delete_many()
                    .filter(workspace_members::Column::WorkspaceId.eq(workspace_id))
                    .filter(workspace_members::Column::UserId.eq(target_id))
                    .exec(db_tx)
                    .await?
                    .rows_affected
            }
        };
        if affected == 0 {
            return Err(EngineError::MemberNotFound);
        }
        Ok(())
    }
}
