//! Category primitives.
//!
//! Categories label transactions and subscriptions. Built-in defaults (seeded
//! by the migration, `user_id IS NULL`) are shared by every user and are
//! immutable; user categories are unique per owner on their normalized name.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for CategoryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidName(format!(
                "invalid category kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    /// `None` marks a built-in default category.
    pub user_id: Option<String>,
    pub name: String,
    pub kind: CategoryKind,
}

impl Category {
    pub fn is_default(&self) -> bool {
        self.user_id.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    /// NFKC-folded lowercase key backing per-owner uniqueness.
    pub name_norm: String,
    pub kind: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "category")?,
            user_id: model.user_id,
            name: model.name,
            kind: CategoryKind::try_from(model.kind.as_str())?,
        })
    }
}
