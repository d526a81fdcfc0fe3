use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    BillingCycle, Currency, Engine, SubscriptionNewCmd, SubscriptionUpdateCmd, TransactionKind,
    TransactionListFilter, TransactionNewCmd,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["alice".into(), "password".into()],
    ))
    .await
    .unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

#[tokio::test]
async fn due_subscription_is_billed_once() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();
    engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            account.id,
            TransactionKind::Income,
            10_000,
            date(2023, 12, 20),
        ))
        .await
        .unwrap();

    let sub = engine
        .create_subscription(SubscriptionNewCmd::new(
            "alice",
            account.id,
            "Streaming",
            2_000,
            BillingCycle::Monthly,
            date(2024, 1, 1),
        ))
        .await
        .unwrap();

    let report = engine.run_billing_cycle(date(2024, 1, 15)).await.unwrap();
    assert_eq!(report.processed.len(), 1);
    assert!(report.skipped.is_empty());
    assert_eq!(report.processed[0].subscription_id, sub.id);
    assert_eq!(report.processed[0].next_billing_date, date(2024, 2, 1));

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 8_000);

    let tx = engine
        .transaction("alice", report.processed[0].transaction_id)
        .await
        .unwrap();
    assert_eq!(tx.kind, TransactionKind::Expense);
    assert_eq!(tx.amount_minor, 2_000);
    assert_eq!(tx.currency, Currency::Usd);
    // Dated at the due date being settled, not the run instant.
    assert_eq!(tx.occurred_at, date(2024, 1, 1));
    assert_eq!(tx.subscription_id, Some(sub.id));
    assert_eq!(tx.note.as_deref(), Some("Streaming (monthly)"));

    let updated = engine.subscription("alice", sub.id).await.unwrap();
    assert_eq!(updated.next_billing_date, date(2024, 2, 1));

    // Already advanced past "now": a second run bills nothing.
    let report = engine.run_billing_cycle(date(2024, 1, 15)).await.unwrap();
    assert!(report.processed.is_empty());
    assert!(report.skipped.is_empty());
}

#[tokio::test]
async fn overdue_subscription_catches_up_one_cycle_per_run() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();

    let sub = engine
        .create_subscription(SubscriptionNewCmd::new(
            "alice",
            account.id,
            "Gym",
            3_000,
            BillingCycle::Monthly,
            date(2024, 1, 1),
        ))
        .await
        .unwrap();

    let now = date(2024, 3, 15);
    for expected_next in [date(2024, 2, 1), date(2024, 3, 1), date(2024, 4, 1)] {
        let report = engine.run_billing_cycle(now).await.unwrap();
        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.processed[0].next_billing_date, expected_next);
    }

    // Caught up: 2024-04-01 is in the future relative to `now`.
    let report = engine.run_billing_cycle(now).await.unwrap();
    assert!(report.processed.is_empty());

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, -9_000);

    let updated = engine.subscription("alice", sub.id).await.unwrap();
    assert_eq!(updated.next_billing_date, date(2024, 4, 1));
}

#[tokio::test]
async fn paused_and_future_subscriptions_are_not_billed() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();

    let paused = engine
        .create_subscription(SubscriptionNewCmd::new(
            "alice",
            account.id,
            "Paused",
            1_000,
            BillingCycle::Monthly,
            date(2024, 1, 1),
        ))
        .await
        .unwrap();
    engine
        .update_subscription(SubscriptionUpdateCmd::new("alice", paused.id).is_active(false))
        .await
        .unwrap();

    engine
        .create_subscription(SubscriptionNewCmd::new(
            "alice",
            account.id,
            "Future",
            1_000,
            BillingCycle::Yearly,
            date(2030, 1, 1),
        ))
        .await
        .unwrap();

    let report = engine.run_billing_cycle(date(2024, 6, 1)).await.unwrap();
    assert!(report.processed.is_empty());
    assert!(report.skipped.is_empty());

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 0);
}

#[tokio::test]
async fn failing_item_does_not_block_the_batch() {
    let (engine, _db) = engine_with_db().await;
    let doomed = engine
        .create_account("alice", "Doomed", Currency::Usd)
        .await
        .unwrap();
    let healthy = engine
        .create_account("alice", "Healthy", Currency::Usd)
        .await
        .unwrap();

    let broken = engine
        .create_subscription(SubscriptionNewCmd::new(
            "alice",
            doomed.id,
            "Broken",
            1_000,
            BillingCycle::Monthly,
            date(2024, 1, 1),
        ))
        .await
        .unwrap();
    let billable = engine
        .create_subscription(SubscriptionNewCmd::new(
            "alice",
            healthy.id,
            "Billable",
            2_000,
            BillingCycle::Monthly,
            date(2024, 1, 2),
        ))
        .await
        .unwrap();

    // Archive the first account so its subscription cannot be billed.
    engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            doomed.id,
            TransactionKind::Income,
            100,
            date(2023, 12, 1),
        ))
        .await
        .unwrap();
    engine.delete_account("alice", doomed.id).await.unwrap();

    let report = engine.run_billing_cycle(date(2024, 1, 15)).await.unwrap();
    assert_eq!(report.processed.len(), 1);
    assert_eq!(report.processed[0].subscription_id, billable.id);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].subscription_id, broken.id);

    // The skipped subscription did not advance and nothing was charged to it.
    let broken = engine.subscription("alice", broken.id).await.unwrap();
    assert_eq!(broken.next_billing_date, date(2024, 1, 1));

    let healthy_account = engine.account("alice", healthy.id).await.unwrap();
    assert_eq!(healthy_account.balance_minor, -2_000);
}

#[tokio::test]
async fn concurrent_runs_charge_a_due_subscription_once() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();

    let sub = engine
        .create_subscription(SubscriptionNewCmd::new(
            "alice",
            account.id,
            "Streaming",
            2_000,
            BillingCycle::Monthly,
            date(2024, 1, 1),
        ))
        .await
        .unwrap();

    // Two overlapping scheduler runs race on the same due subscription; the
    // next_billing_date compare-and-set lets exactly one of them charge it.
    let engine = std::sync::Arc::new(engine);
    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.run_billing_cycle(date(2024, 1, 15)).await }
    });
    let second = tokio::spawn({
        let engine = engine.clone();
        async move { engine.run_billing_cycle(date(2024, 1, 15)).await }
    });
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(first.processed.len() + second.processed.len(), 1);

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, -2_000);

    let updated = engine.subscription("alice", sub.id).await.unwrap();
    assert_eq!(updated.next_billing_date, date(2024, 2, 1));
}

#[tokio::test]
async fn billed_transaction_takes_the_account_currency() {
    let (engine, _db) = engine_with_db().await;
    let pesos = engine
        .create_account("alice", "Pesos", Currency::Ars)
        .await
        .unwrap();

    engine
        .create_subscription(SubscriptionNewCmd::new(
            "alice",
            pesos.id,
            "Internet",
            150_000,
            BillingCycle::Monthly,
            date(2024, 1, 1),
        ))
        .await
        .unwrap();

    let report = engine.run_billing_cycle(date(2024, 1, 2)).await.unwrap();
    assert_eq!(report.processed.len(), 1);

    let tx = engine
        .transaction("alice", report.processed[0].transaction_id)
        .await
        .unwrap();
    assert_eq!(tx.currency, Currency::Ars);
}

#[tokio::test]
async fn billed_rows_show_up_in_the_ledger_listing() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();

    engine
        .create_subscription(SubscriptionNewCmd::new(
            "alice",
            account.id,
            "Streaming",
            2_000,
            BillingCycle::Monthly,
            date(2024, 1, 1),
        ))
        .await
        .unwrap();
    engine.run_billing_cycle(date(2024, 1, 2)).await.unwrap();

    let filter = TransactionListFilter {
        kinds: Some(vec![TransactionKind::Expense]),
        ..Default::default()
    };
    let page = engine
        .list_transactions("alice", &filter, 10, None)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(page.items[0].subscription_id.is_some());
}
