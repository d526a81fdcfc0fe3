//! Centavo engine: data model, ledger mutation core and billing scheduler.
//!
//! The engine owns every write to the `accounts.balance_minor` cache. All
//! call sites (HTTP handlers through [`Engine`] and the billing scheduler)
//! funnel through the ledger primitives in `ops::ledger`, so the invariant
//! "balance == signed sum of income/expense transactions" has a single
//! enforcement point.

pub use accounts::Account;
pub use categories::{Category, CategoryKind};
pub use commands::{
    SubscriptionNewCmd, SubscriptionUpdateCmd, TransactionNewCmd, TransactionUpdateCmd,
};
pub use currency::Currency;
pub use error::EngineError;
pub use money::MoneyCents;
pub use ops::{
    AccountRemoval, BillingOutcome, BillingReport, BillingSkip, Engine, EngineBuilder,
    TransactionListFilter, TransactionPage,
};
pub use subscriptions::{BillingCycle, Subscription};
pub use transactions::{Transaction, TransactionKind};

mod accounts;
mod categories;
mod commands;
mod currency;
mod error;
mod money;
mod ops;
mod subscriptions;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
