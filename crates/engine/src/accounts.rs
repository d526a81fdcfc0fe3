//! The module contains the `Account` struct and its storage model.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, util::parse_uuid};

/// A financial account.
///
/// An account represents a real place money lives: a bank account, a cash
/// stash, a card. Its `balance_minor` is a cached aggregate that must always
/// equal the signed sum of the income/expense transactions posted against it;
/// it is mutated only through the ledger primitives in `ops::ledger`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier, generated once and persisted.
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub currency: Currency,
    pub balance_minor: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: String, name: String, currency: Currency, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            currency,
            balance_minor: 0,
            is_active: true,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub currency: String,
    pub balance_minor: i64,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::subscriptions::Entity")]
    Subscriptions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::subscriptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            user_id: ActiveValue::Set(account.user_id.clone()),
            name: ActiveValue::Set(account.name.clone()),
            currency: ActiveValue::Set(account.currency.code().to_string()),
            balance_minor: ActiveValue::Set(account.balance_minor),
            is_active: ActiveValue::Set(account.is_active),
            created_at: ActiveValue::Set(account.created_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            user_id: model.user_id,
            name: model.name,
            currency: Currency::try_from(model.currency.as_str())?,
            balance_minor: model.balance_minor,
            is_active: model.is_active,
            created_at: model.created_at,
        })
    }
}
