//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{BillingCycle, TransactionKind};

/// Create a transaction.
#[derive(Clone, Debug)]
pub struct TransactionNewCmd {
    pub user_id: String,
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub occurred_at: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub note: Option<String>,
}

impl TransactionNewCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        account_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            account_id,
            kind,
            amount_minor,
            occurred_at,
            category_id: None,
            note: None,
        }
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Update an existing transaction. `None` fields keep their current value;
/// there is no explicit-null form, so `note` and `category_id` cannot be
/// cleared once set.
#[derive(Clone, Debug)]
pub struct TransactionUpdateCmd {
    pub user_id: String,
    pub transaction_id: Uuid,
    pub amount_minor: Option<i64>,
    pub kind: Option<TransactionKind>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub note: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl TransactionUpdateCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, transaction_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            transaction_id,
            amount_minor: None,
            kind: None,
            account_id: None,
            category_id: None,
            note: None,
            occurred_at: None,
        }
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }
}

/// Create a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionNewCmd {
    pub user_id: String,
    pub account_id: Uuid,
    pub name: String,
    pub amount_minor: i64,
    pub billing_cycle: BillingCycle,
    pub next_billing_date: DateTime<Utc>,
    pub category_id: Option<Uuid>,
}

impl SubscriptionNewCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        account_id: Uuid,
        name: impl Into<String>,
        amount_minor: i64,
        billing_cycle: BillingCycle,
        next_billing_date: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            account_id,
            name: name.into(),
            amount_minor,
            billing_cycle,
            next_billing_date,
            category_id: None,
        }
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Update an existing subscription. `None` fields keep their current value.
#[derive(Clone, Debug)]
pub struct SubscriptionUpdateCmd {
    pub user_id: String,
    pub subscription_id: Uuid,
    pub name: Option<String>,
    pub amount_minor: Option<i64>,
    pub billing_cycle: Option<BillingCycle>,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

impl SubscriptionUpdateCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, subscription_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            subscription_id,
            name: None,
            amount_minor: None,
            billing_cycle: None,
            next_billing_date: None,
            category_id: None,
            is_active: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn billing_cycle(mut self, billing_cycle: BillingCycle) -> Self {
        self.billing_cycle = Some(billing_cycle);
        self
    }

    #[must_use]
    pub fn next_billing_date(mut self, next_billing_date: DateTime<Utc>) -> Self {
        self.next_billing_date = Some(next_billing_date);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }
}
