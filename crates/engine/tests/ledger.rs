use chrono::{TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Currency, Engine, EngineError, TransactionKind, TransactionListFilter, TransactionNewCmd,
    TransactionUpdateCmd,
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

fn date(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn balance_tracks_signed_deltas() {
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
            date(2024, 1, 5),
        ))
        .await
        .unwrap();
    engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            account.id,
            TransactionKind::Expense,
            5_000,
            date(2024, 1, 6),
        ))
        .await
        .unwrap();
    engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            account.id,
            TransactionKind::Expense,
            3_000,
            date(2024, 1, 7),
        ))
        .await
        .unwrap();
    engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            account.id,
            TransactionKind::Transfer,
            9_999,
            date(2024, 1, 8),
        ))
        .await
        .unwrap();

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 2_000);
}

#[tokio::test]
async fn transfer_rows_are_recorded_without_balance_effect() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();

    let tx = engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            account.id,
            TransactionKind::Transfer,
            4_200,
            date(2024, 2, 1),
        ))
        .await
        .unwrap();

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 0);

    let fetched = engine.transaction("alice", tx.id).await.unwrap();
    assert_eq!(fetched.kind, TransactionKind::Transfer);
    assert_eq!(fetched.amount_minor, 4_200);
}

#[tokio::test]
async fn update_amount_adjusts_by_difference() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();

    let tx = engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            account.id,
            TransactionKind::Expense,
            5_000,
            date(2024, 1, 6),
        ))
        .await
        .unwrap();

    engine
        .update_transaction(TransactionUpdateCmd::new("alice", tx.id).amount_minor(7_500))
        .await
        .unwrap();

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, -7_500);
}

#[tokio::test]
async fn update_kind_flips_the_sign() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();

    let tx = engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            account.id,
            TransactionKind::Expense,
            5_000,
            date(2024, 1, 6),
        ))
        .await
        .unwrap();

    engine
        .update_transaction(TransactionUpdateCmd::new("alice", tx.id).kind(TransactionKind::Income))
        .await
        .unwrap();

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 5_000);
}

#[tokio::test]
async fn moving_between_accounts_moves_the_delta() {
    let (engine, _db) = engine_with_db().await;
    let checking = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();
    let savings = engine
        .create_account("alice", "Savings", Currency::Usd)
        .await
        .unwrap();

    let tx = engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            checking.id,
            TransactionKind::Income,
            10_000,
            date(2024, 1, 5),
        ))
        .await
        .unwrap();

    engine
        .update_transaction(TransactionUpdateCmd::new("alice", tx.id).account_id(savings.id))
        .await
        .unwrap();

    let checking = engine.account("alice", checking.id).await.unwrap();
    let savings = engine.account("alice", savings.id).await.unwrap();
    assert_eq!(checking.balance_minor, 0);
    assert_eq!(savings.balance_minor, 10_000);
}

#[tokio::test]
async fn updates_merge_and_never_clear_note_or_category() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();

    let categories = engine.list_categories("alice").await.unwrap();
    let groceries = categories
        .iter()
        .find(|c| c.name == "Groceries")
        .expect("seeded default");

    let tx = engine
        .create_transaction(
            TransactionNewCmd::new(
                "alice",
                account.id,
                TransactionKind::Expense,
                2_500,
                date(2024, 1, 6),
            )
            .category_id(groceries.id)
            .note("weekly shop"),
        )
        .await
        .unwrap();

    // Omitted fields keep their stored values; there is no explicit-null
    // form, so the note and category survive an amount-only update.
    let updated = engine
        .update_transaction(TransactionUpdateCmd::new("alice", tx.id).amount_minor(3_000))
        .await
        .unwrap();
    assert_eq!(updated.amount_minor, 3_000);
    assert_eq!(updated.note.as_deref(), Some("weekly shop"));
    assert_eq!(updated.category_id, Some(groceries.id));

    let fetched = engine.transaction("alice", tx.id).await.unwrap();
    assert_eq!(fetched.note.as_deref(), Some("weekly shop"));
    assert_eq!(fetched.category_id, Some(groceries.id));
}

#[tokio::test]
async fn cross_currency_move_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let usd = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();
    let ars = engine
        .create_account("alice", "Pesos", Currency::Ars)
        .await
        .unwrap();

    let tx = engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            usd.id,
            TransactionKind::Expense,
            2_000,
            date(2024, 1, 5),
        ))
        .await
        .unwrap();

    let err = engine
        .update_transaction(TransactionUpdateCmd::new("alice", tx.id).account_id(ars.id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CurrencyMismatch(_)));

    let usd = engine.account("alice", usd.id).await.unwrap();
    let ars = engine.account("alice", ars.id).await.unwrap();
    assert_eq!(usd.balance_minor, -2_000);
    assert_eq!(ars.balance_minor, 0);
}

#[tokio::test]
async fn delete_reverts_the_contribution() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();

    let tx = engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            account.id,
            TransactionKind::Income,
            10_000,
            date(2024, 1, 5),
        ))
        .await
        .unwrap();
    engine.delete_transaction("alice", tx.id).await.unwrap();

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 0);

    let err = engine.transaction("alice", tx.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn rejects_zero_and_negative_amounts() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();

    for amount in [0, -100] {
        let err = engine
            .create_transaction(TransactionNewCmd::new(
                "alice",
                account.id,
                TransactionKind::Income,
                amount,
                date(2024, 1, 5),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }
}

#[tokio::test]
async fn rejects_unknown_and_foreign_accounts() {
    let (engine, db) = engine_with_db().await;
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["bob".into(), "password".into()],
    ))
    .await
    .unwrap();

    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();

    let err = engine
        .create_transaction(TransactionNewCmd::new(
            "bob",
            account.id,
            TransactionKind::Income,
            1_000,
            date(2024, 1, 5),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            uuid::Uuid::new_v4(),
            TransactionKind::Income,
            1_000,
            date(2024, 1, 5),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn list_paginates_newest_first() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("alice", "Checking", Currency::Usd)
        .await
        .unwrap();

    for day in 1..=5u8 {
        engine
            .create_transaction(TransactionNewCmd::new(
                "alice",
                account.id,
                TransactionKind::Income,
                1_000 * i64::from(day),
                date(2024, 3, u32::from(day)),
            ))
            .await
            .unwrap();
    }

    let filter = TransactionListFilter::default();
    let first = engine
        .list_transactions("alice", &filter, 2, None)
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].amount_minor, 5_000);
    assert_eq!(first.items[1].amount_minor, 4_000);
    let cursor = first.next_cursor.expect("more pages expected");

    let second = engine
        .list_transactions("alice", &filter, 2, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 2);
    assert_eq!(second.items[0].amount_minor, 3_000);

    let cursor = second.next_cursor.expect("more pages expected");
    let last = engine
        .list_transactions("alice", &filter, 2, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].amount_minor, 1_000);
    assert!(last.next_cursor.is_none());
}

#[tokio::test]
async fn list_rejects_inverted_range_and_garbage_cursor() {
    let (engine, _db) = engine_with_db().await;

    let filter = TransactionListFilter {
        from: Some(date(2024, 2, 1)),
        to: Some(date(2024, 1, 1)),
        ..Default::default()
    };
    let err = engine
        .list_transactions("alice", &filter, 10, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let filter = TransactionListFilter::default();
    let err = engine
        .list_transactions("alice", &filter, 10, Some("not-a-cursor"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidId(_)));
}

#[tokio::test]
async fn account_with_history_is_archived_not_deleted() {
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
            1_000,
            date(2024, 1, 5),
        ))
        .await
        .unwrap();

    let removal = engine.delete_account("alice", account.id).await.unwrap();
    assert_eq!(removal, engine::AccountRemoval::Archived);

    // Archived accounts no longer accept writes.
    let err = engine
        .create_transaction(TransactionNewCmd::new(
            "alice",
            account.id,
            TransactionKind::Income,
            1_000,
            date(2024, 1, 6),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    // But their history and cached balance survive.
    let archived = engine.account("alice", account.id).await.unwrap();
    assert!(!archived.is_active);
    assert_eq!(archived.balance_minor, 1_000);
}
