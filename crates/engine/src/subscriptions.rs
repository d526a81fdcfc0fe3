//! Recurring subscription primitives.
//!
//! A `Subscription` is a standing order the billing scheduler turns into one
//! expense transaction per cycle. It never self-terminates: while active and
//! overdue it keeps firing, one cycle per scheduler run.

use chrono::{DateTime, Months, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    const fn months(self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Yearly => 12,
        }
    }

    /// Next billing instant, exactly one cycle after `from`.
    ///
    /// The advance is computed from the stored date, not from "now", so a
    /// subscription several cycles overdue catches up one cycle per scheduler
    /// run. Month-end dates clamp (Jan 31 -> Feb 28/29).
    pub fn advance(self, from: DateTime<Utc>) -> ResultEngine<DateTime<Utc>> {
        from.checked_add_months(Months::new(self.months()))
            .ok_or_else(|| {
                EngineError::InvalidAmount("next billing date out of range".to_string())
            })
    }
}

impl TryFrom<&str> for BillingCycle {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::InvalidName(format!(
                "invalid billing cycle: {other}"
            ))),
        }
    }
}

impl core::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub amount_minor: i64,
    pub billing_cycle: BillingCycle,
    pub next_billing_date: DateTime<Utc>,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// True when the scheduler should bill this subscription.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_billing_date <= now
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub amount_minor: i64,
    pub billing_cycle: String,
    pub next_billing_date: DateTimeUtc,
    pub account_id: String,
    pub category_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
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
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Subscription> for ActiveModel {
    fn from(sub: &Subscription) -> Self {
        Self {
            id: ActiveValue::Set(sub.id.to_string()),
            user_id: ActiveValue::Set(sub.user_id.clone()),
            name: ActiveValue::Set(sub.name.clone()),
            amount_minor: ActiveValue::Set(sub.amount_minor),
            billing_cycle: ActiveValue::Set(sub.billing_cycle.as_str().to_string()),
            next_billing_date: ActiveValue::Set(sub.next_billing_date),
            account_id: ActiveValue::Set(sub.account_id.to_string()),
            category_id: ActiveValue::Set(sub.category_id.map(|id| id.to_string())),
            is_active: ActiveValue::Set(sub.is_active),
            created_at: ActiveValue::Set(sub.created_at),
        }
    }
}

impl TryFrom<Model> for Subscription {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "subscription")?,
            user_id: model.user_id,
            name: model.name,
            amount_minor: model.amount_minor,
            billing_cycle: BillingCycle::try_from(model.billing_cycle.as_str())?,
            next_billing_date: model.next_billing_date,
            account_id: parse_uuid(&model.account_id, "account")?,
            category_id: model
                .category_id
                .as_deref()
                .map(|id| parse_uuid(id, "category"))
                .transpose()?,
            is_active: model.is_active,
            created_at: model.created_at,
        })
    }
}
