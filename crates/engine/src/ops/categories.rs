use uuid::Uuid;

use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};

use crate::{
    Category, CategoryKind, EngineError, ResultEngine, categories,
    util::{normalize_category_display, normalize_category_key},
};

use super::{Engine, with_tx};

impl Engine {
    /// Finds a category visible to `user_id`: one of their own or a built-in
    /// default.
    pub(super) async fn require_category(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        category_id: Uuid,
    ) -> ResultEngine<categories::Model> {
        categories::Entity::find_by_id(category_id.to_string())
            .filter(
                Condition::any()
                    .add(categories::Column::UserId.is_null())
                    .add(categories::Column::UserId.eq(user_id.to_string())),
            )
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))
    }

    async fn name_taken(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        name_norm: &str,
        exclude: Option<Uuid>,
    ) -> ResultEngine<bool> {
        let mut query = categories::Entity::find()
            .filter(
                Condition::any()
                    .add(categories::Column::UserId.is_null())
                    .add(categories::Column::UserId.eq(user_id.to_string())),
            )
            .filter(categories::Column::NameNorm.eq(name_norm.to_string()));
        if let Some(id) = exclude {
            query = query.filter(categories::Column::Id.ne(id.to_string()));
        }
        Ok(query.one(db_tx).await?.is_some())
    }

    pub async fn create_category(
        &self,
        user_id: &str,
        name: &str,
        kind: CategoryKind,
    ) -> ResultEngine<Category> {
        let display = normalize_category_display(name)?;
        let normalized = normalize_category_key(&display);

        with_tx!(self, |db_tx| {
            if self.name_taken(&db_tx, user_id, &normalized, None).await? {
                return Err(EngineError::ExistingKey(display.clone()));
            }

            let id = Uuid::new_v4();
            let active = categories::ActiveModel {
                id: ActiveValue::Set(id.to_string()),
                user_id: ActiveValue::Set(Some(user_id.to_string())),
                name: ActiveValue::Set(display.clone()),
                name_norm: ActiveValue::Set(normalized),
                kind: ActiveValue::Set(kind.as_str().to_string()),
            };
            active.insert(&db_tx).await?;

            Ok(Category {
                id,
                user_id: Some(user_id.to_string()),
                name: display,
                kind,
            })
        })
    }

    /// Lists built-in defaults plus the user's own categories.
    pub async fn list_categories(&self, user_id: &str) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .filter(
                Condition::any()
                    .add(categories::Column::UserId.is_null())
                    .add(categories::Column::UserId.eq(user_id.to_string())),
            )
            .order_by_asc(categories::Column::NameNorm)
            .all(&self.database)
            .await?;
        models.into_iter().map(Category::try_from).collect()
    }

    /// Renames a user category. Built-in defaults are immutable.
    pub async fn rename_category(
        &self,
        user_id: &str,
        category_id: Uuid,
        new_name: &str,
    ) -> ResultEngine<Category> {
        let display = normalize_category_display(new_name)?;
        let normalized = normalize_category_key(&display);

        with_tx!(self, |db_tx| {
            let model = self.require_category(&db_tx, user_id, category_id).await?;
            if model.user_id.is_none() {
                return Err(EngineError::Immutable(
                    "default categories cannot be renamed".to_string(),
                ));
            }
            if self
                .name_taken(&db_tx, user_id, &normalized, Some(category_id))
                .await?
            {
                return Err(EngineError::ExistingKey(display.clone()));
            }

            let active = categories::ActiveModel {
                id: ActiveValue::Set(category_id.to_string()),
                name: ActiveValue::Set(display),
                name_norm: ActiveValue::Set(normalized),
                ..Default::default()
            };
            let model = active.update(&db_tx).await?;
            Category::try_from(model)
        })
    }

    /// Deletes a user category. Built-in defaults are undeletable; referencing
    /// transactions keep their rows and lose the label (`ON DELETE SET NULL`).
    pub async fn delete_category(&self, user_id: &str, category_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_category(&db_tx, user_id, category_id).await?;
            if model.user_id.is_none() {
                return Err(EngineError::Immutable(
                    "default categories cannot be deleted".to_string(),
                ));
            }

            let active: categories::ActiveModel = model.into();
            active.delete(&db_tx).await?;
            Ok(())
        })
    }
}
