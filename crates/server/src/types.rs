//! Wire payloads for the HTTP API.
//!
//! Enums (`Currency`, `TransactionKind`, `CategoryKind`, `BillingCycle`) are
//! the engine's own serde-enabled types; views flatten the engine structs into
//! what the API exposes.

pub mod account {
    use chrono::{DateTime, Utc};
    use engine::{Account, AccountRemoval, Currency};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        #[serde(default)]
        pub currency: Option<Currency>,
    }

    #[derive(Debug, Deserialize)]
    pub struct AccountUpdate {
        pub name: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct AccountListQuery {
        #[serde(default)]
        pub include_inactive: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: Uuid,
        pub name: String,
        pub currency: Currency,
        pub balance_minor: i64,
        pub is_active: bool,
        pub created_at: DateTime<Utc>,
    }

    impl From<Account> for AccountView {
        fn from(account: Account) -> Self {
            Self {
                id: account.id,
                name: account.name,
                currency: account.currency,
                balance_minor: account.balance_minor,
                is_active: account.is_active,
                created_at: account.created_at,
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountDeleted {
        pub removal: String,
    }

    impl From<AccountRemoval> for AccountDeleted {
        fn from(removal: AccountRemoval) -> Self {
            let removal = match removal {
                AccountRemoval::Archived => "archived",
                AccountRemoval::Deleted => "deleted",
            };
            Self {
                removal: removal.to_string(),
            }
        }
    }
}

pub mod category {
    use engine::{Category, CategoryKind};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub kind: CategoryKind,
    }

    #[derive(Debug, Deserialize)]
    pub struct CategoryUpdate {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub kind: CategoryKind,
        pub is_default: bool,
    }

    impl From<Category> for CategoryView {
        fn from(category: Category) -> Self {
            let is_default = category.is_default();
            Self {
                id: category.id,
                name: category.name,
                kind: category.kind,
                is_default,
            }
        }
    }
}

pub mod transaction {
    use chrono::{DateTime, Utc};
    use engine::{Currency, Transaction, TransactionKind};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Deserialize)]
    pub struct TransactionNew {
        pub account_id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub occurred_at: DateTime<Utc>,
        #[serde(default)]
        pub category_id: Option<Uuid>,
        #[serde(default)]
        pub note: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct TransactionUpdate {
        #[serde(default)]
        pub account_id: Option<Uuid>,
        #[serde(default)]
        pub kind: Option<TransactionKind>,
        #[serde(default)]
        pub amount_minor: Option<i64>,
        #[serde(default)]
        pub occurred_at: Option<DateTime<Utc>>,
        #[serde(default)]
        pub category_id: Option<Uuid>,
        #[serde(default)]
        pub note: Option<String>,
    }

    /// Query-string filters for the list endpoint. `kinds` is a
    /// comma-separated list (`kinds=income,expense`).
    #[derive(Debug, Default, Deserialize)]
    pub struct TransactionListQuery {
        #[serde(default)]
        pub account_id: Option<Uuid>,
        #[serde(default)]
        pub from: Option<DateTime<Utc>>,
        #[serde(default)]
        pub to: Option<DateTime<Utc>>,
        #[serde(default)]
        pub kinds: Option<String>,
        #[serde(default)]
        pub limit: Option<u64>,
        #[serde(default)]
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub account_id: Uuid,
        pub category_id: Option<Uuid>,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub currency: Currency,
        pub occurred_at: DateTime<Utc>,
        pub note: Option<String>,
        pub subscription_id: Option<Uuid>,
    }

    impl From<Transaction> for TransactionView {
        fn from(tx: Transaction) -> Self {
            Self {
                id: tx.id,
                account_id: tx.account_id,
                category_id: tx.category_id,
                kind: tx.kind,
                amount_minor: tx.amount_minor,
                currency: tx.currency,
                occurred_at: tx.occurred_at,
                note: tx.note,
                subscription_id: tx.subscription_id,
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub next_cursor: Option<String>,
    }
}

pub mod subscription {
    use chrono::{DateTime, Utc};
    use engine::{BillingCycle, Subscription};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Deserialize)]
    pub struct SubscriptionNew {
        pub account_id: Uuid,
        pub name: String,
        pub amount_minor: i64,
        pub billing_cycle: BillingCycle,
        pub next_billing_date: DateTime<Utc>,
        #[serde(default)]
        pub category_id: Option<Uuid>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SubscriptionUpdate {
        #[serde(default)]
        pub name: Option<String>,
        #[serde(default)]
        pub amount_minor: Option<i64>,
        #[serde(default)]
        pub billing_cycle: Option<BillingCycle>,
        #[serde(default)]
        pub next_billing_date: Option<DateTime<Utc>>,
        #[serde(default)]
        pub category_id: Option<Uuid>,
        #[serde(default)]
        pub is_active: Option<bool>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SubscriptionListQuery {
        #[serde(default)]
        pub include_inactive: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SubscriptionView {
        pub id: Uuid,
        pub account_id: Uuid,
        pub category_id: Option<Uuid>,
        pub name: String,
        pub amount_minor: i64,
        pub billing_cycle: BillingCycle,
        pub next_billing_date: DateTime<Utc>,
        pub is_active: bool,
        pub created_at: DateTime<Utc>,
    }

    impl From<Subscription> for SubscriptionView {
        fn from(sub: Subscription) -> Self {
            Self {
                id: sub.id,
                account_id: sub.account_id,
                category_id: sub.category_id,
                name: sub.name,
                amount_minor: sub.amount_minor,
                billing_cycle: sub.billing_cycle,
                next_billing_date: sub.next_billing_date,
                is_active: sub.is_active,
                created_at: sub.created_at,
            }
        }
    }
}
