//! Recurring billing: turns due subscriptions into expense transactions.
//!
//! Each due subscription is processed in its own storage transaction holding
//! three writes: the materialized expense row, its balance effect (through
//! `ops::ledger`) and the schedule advance. A failure on one subscription
//! rolls back only that unit; the rest of the batch proceeds.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{
    QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    Currency, EngineError, ResultEngine, Subscription, Transaction, TransactionKind,
    subscriptions, transactions,
};

use super::{Engine, ledger, with_tx};

/// A subscription successfully billed during a cycle run.
#[derive(Clone, Debug)]
pub struct BillingOutcome {
    pub subscription_id: Uuid,
    pub transaction_id: Uuid,
    pub amount_minor: i64,
    pub next_billing_date: DateTime<Utc>,
}

/// A subscription skipped during a cycle run, with the reason.
#[derive(Clone, Debug)]
pub struct BillingSkip {
    pub subscription_id: Uuid,
    pub reason: String,
}

/// Per-item outcomes of one `run_billing_cycle` invocation.
#[derive(Clone, Debug, Default)]
pub struct BillingReport {
    pub processed: Vec<BillingOutcome>,
    pub skipped: Vec<BillingSkip>,
}

impl Engine {
    /// Subscriptions that are active and whose `next_billing_date` has
    /// elapsed at `now`, oldest due date first.
    pub async fn due_subscriptions(&self, now: DateTime<Utc>) -> ResultEngine<Vec<Subscription>> {
        let models = subscriptions::Entity::find()
            .filter(subscriptions::Column::IsActive.eq(true))
            .filter(subscriptions::Column::NextBillingDate.lte(now))
            .order_by_asc(subscriptions::Column::NextBillingDate)
            .all(&self.database)
            .await?;
        models.into_iter().map(Subscription::try_from).collect()
    }

    /// Runs one billing pass at the given instant.
    ///
    /// `now` is a parameter rather than a clock read so schedule advancement
    /// is testable without real time passing; the production timer simply
    /// passes `Utc::now()`.
    ///
    /// Each due subscription advances by exactly one cycle per run: a
    /// subscription overdue by several cycles catches up across successive
    /// runs instead of jumping to a future date. The run itself only fails
    /// if the due query fails; per-item failures land in the report.
    pub async fn run_billing_cycle(&self, now: DateTime<Utc>) -> ResultEngine<BillingReport> {
        let due = self.due_subscriptions(now).await?;
        tracing::debug!(count = due.len(), "billing cycle: due subscriptions");

        let mut report = BillingReport::default();
        for sub in due {
            match self.bill_subscription(&sub).await {
                Ok(outcome) => {
                    tracing::info!(
                        subscription = %sub.id,
                        transaction = %outcome.transaction_id,
                        amount_minor = outcome.amount_minor,
                        next = %outcome.next_billing_date,
                        "billed subscription"
                    );
                    report.processed.push(outcome);
                }
                Err(err) => {
                    tracing::warn!(subscription = %sub.id, error = %err, "skipped subscription");
                    report.skipped.push(BillingSkip {
                        subscription_id: sub.id,
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Bills one subscription in a single storage transaction.
    async fn bill_subscription(&self, sub: &Subscription) -> ResultEngine<BillingOutcome> {
        with_tx!(self, |db_tx| {
            let account = self
                .require_active_account(&db_tx, &sub.user_id, sub.account_id)
                .await?;

            let next = sub.billing_cycle.advance(sub.next_billing_date)?;

            // Compare-and-set on the previous due date: if another run already
            // advanced this subscription, billing it again would double-charge
            // the same window, so the loser backs off and the unit rolls back.
            let advanced = subscriptions::Entity::update_many()
                .col_expr(subscriptions::Column::NextBillingDate, Expr::value(next))
                .filter(subscriptions::Column::Id.eq(sub.id.to_string()))
                .filter(subscriptions::Column::NextBillingDate.eq(sub.next_billing_date))
                .exec(&db_tx)
                .await?;
            if advanced.rows_affected == 0 {
                return Err(EngineError::ExistingKey(format!(
                    "subscription {} already billed for {}",
                    sub.id, sub.next_billing_date
                )));
            }

            // The emitted transaction takes the account's currency, not one
            // stored on the subscription, and is dated at the due date being
            // settled.
            let mut tx = Transaction::new(
                sub.user_id.clone(),
                sub.account_id,
                sub.category_id,
                TransactionKind::Expense,
                sub.amount_minor,
                Currency::try_from(account.currency.as_str())?,
                sub.next_billing_date,
                Some(format!("{} ({})", sub.name, sub.billing_cycle)),
            )?;
            tx.subscription_id = Some(sub.id);

            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            ledger::apply_on_create(&db_tx, &tx).await?;

            Ok(BillingOutcome {
                subscription_id: sub.id,
                transaction_id: tx.id,
                amount_minor: tx.amount_minor,
                next_billing_date: next,
            })
        })
    }
}
