use sea_orm::{QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    Category, EngineError, ResultEngine, TransactionKind, categories, util::is_unique_violation,
};

use super::{Engine, normalize_required_name};

impl Engine {
    /// Create a category. Names are trimmed and unique per workspace and kind.
    pub async fn create_category(
        &self,
        workspace_id: Uuid,
        name: &str,
        kind: TransactionKind,
    ) -> ResultEngine<Category> {
        let name = normalize_required_name(name, "category")?;
        if !self.workspace_exists(workspace_id).await? {
            return Err(EngineError::KeyNotFound("workspace".to_string()));
        }

        let category = Category::new(workspace_id, name, kind);
        categories::ActiveModel::from(&category)
            .insert(&self.database)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    EngineError::ExistingKey(category.name.clone())
                } else {
                    err.into()
                }
            })?;

        tracing::debug!(category_id = %category.id, %workspace_id, "category created");
        Ok(category)
    }

    /// Categories of a workspace in creation order.
    pub async fn list_categories(&self, workspace_id: Uuid) -> ResultEngine<Vec<Category>> {
        categories::Entity::find()
            .filter(categories::Column::WorkspaceId.eq(workspace_id))
            .order_by_asc(categories::Column::CreatedAt)
            .order_by_asc(categories::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Category::try_from)
            .collect()
    }

    /// A category of `workspace_id`. Ids of other workspaces are not found.
    pub async fn category(&self, workspace_id: Uuid, category_id: Uuid) -> ResultEngine<Category> {
        categories::Entity::find_by_id(category_id)
            .filter(categories::Column::WorkspaceId.eq(workspace_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category".to_string()))
            .and_then(Category::try_from)
    }
}
