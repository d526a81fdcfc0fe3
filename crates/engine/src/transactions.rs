//! Transaction primitives.
//!
//! A `Transaction` is a single financial event against one account. Its
//! effect on the account's cached balance is fully described by
//! [`TransactionKind::delta_minor`]; every balance mutation in the engine is
//! derived from that one function.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }

    /// Signed contribution of a transaction of this kind to its account's
    /// cached balance.
    ///
    /// Transfers are tracked rows with no balance effect; only income and
    /// expense move money.
    #[must_use]
    pub const fn delta_minor(self, amount_minor: i64) -> i64 {
        match self {
            Self::Income => amount_minor,
            Self::Expense => -amount_minor,
            Self::Transfer => 0,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub currency: Currency,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
    /// Set on rows materialized by the billing scheduler.
    pub subscription_id: Option<Uuid>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        account_id: Uuid,
        category_id: Option<Uuid>,
        kind: TransactionKind,
        amount_minor: i64,
        currency: Currency,
        occurred_at: DateTime<Utc>,
        note: Option<String>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            account_id,
            category_id,
            kind,
            amount_minor,
            currency,
            occurred_at,
            note,
            subscription_id: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub account_id: String,
    pub category_id: Option<String>,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub occurred_at: DateTimeUtc,
    pub note: Option<String>,
    pub subscription_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Categories,
    #[sea_orm(
        belongs_to = "super::subscriptions::Entity",
        from = "Column::SubscriptionId",
        to = "super::subscriptions::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Subscriptions,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::subscriptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            account_id: ActiveValue::Set(tx.account_id.to_string()),
            category_id: ActiveValue::Set(tx.category_id.map(|id| id.to_string())),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            note: ActiveValue::Set(tx.note.clone()),
            subscription_id: ActiveValue::Set(tx.subscription_id.map(|id| id.to_string())),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            user_id: model.user_id,
            account_id: parse_uuid(&model.account_id, "account")?,
            category_id: model
                .category_id
                .as_deref()
                .map(|id| parse_uuid(id, "category"))
                .transpose()?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str())?,
            occurred_at: model.occurred_at,
            note: model.note,
            subscription_id: model
                .subscription_id
                .as_deref()
                .map(|id| parse_uuid(id, "subscription"))
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_signs_by_kind() {
        assert_eq!(TransactionKind::Income.delta_minor(1050), 1050);
        assert_eq!(TransactionKind::Expense.delta_minor(1050), -1050);
        assert_eq!(TransactionKind::Transfer.delta_minor(1050), 0);
    }

    #[test]
    fn kind_round_trips_through_storage_repr() {
        for kind in [
            TransactionKind::Income,
            TransactionKind::Expense,
            TransactionKind::Transfer,
        ] {
            assert_eq!(TransactionKind::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(TransactionKind::try_from("refund").is_err());
    }

    #[test]
    fn new_rejects_non_positive_amounts() {
        let account_id = Uuid::new_v4();
        for amount in [0, -1] {
            let result = Transaction::new(
                "alice".to_string(),
                account_id,
                None,
                TransactionKind::Expense,
                amount,
                Currency::Usd,
                chrono::Utc::now(),
                None,
            );
            assert!(result.is_err());
        }
    }
}
