use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::{ConnectionTrait, Database, Statement};
use std::sync::Arc;
use tower::ServiceExt;

use server::types::{
    account::{AccountDeleted, AccountView},
    category::CategoryView,
    transaction::{TransactionListResponse, TransactionView},
    subscription::SubscriptionView,
};

async fn app() -> Router {
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

    let engine = engine::Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    server::router(server::ServerState {
        engine: Arc::new(engine),
        db,
    })
}

fn basic_auth(username: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic_auth("alice", "password"));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_account(app: &Router, name: &str) -> AccountView {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/accounts",
            Some(serde_json::json!({ "name": name })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn rejects_missing_credentials() {
    let app = app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/accounts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rejects_wrong_password() {
    let app = app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/accounts")
                .header(header::AUTHORIZATION, basic_auth("alice", "nope"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn account_lifecycle() {
    let app = app().await;

    let account = create_account(&app, "Checking").await;
    assert_eq!(account.name, "Checking");
    assert_eq!(account.balance_minor, 0);
    assert!(account.is_active);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/accounts/{}", account.id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/accounts/{}", account.id),
            Some(serde_json::json!({ "name": "Main checking" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let renamed: AccountView = json_body(response).await;
    assert_eq!(renamed.name, "Main checking");

    let response = app
        .clone()
        .oneshot(request("DELETE", &format!("/accounts/{}", account.id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let deleted: AccountDeleted = json_body(response).await;
    assert_eq!(deleted.removal, "deleted");
}

#[tokio::test]
async fn duplicate_account_name_conflicts() {
    let app = app().await;

    create_account(&app, "Checking").await;
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/accounts",
            Some(serde_json::json!({ "name": "checking" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_account_is_404() {
    let app = app().await;

    let response = app
        .oneshot(request(
            "GET",
            "/accounts/00000000-0000-0000-0000-000000000000",
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transactions_move_the_balance() {
    let app = app().await;
    let account = create_account(&app, "Checking").await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/transactions",
            Some(serde_json::json!({
                "account_id": account.id,
                "kind": "income",
                "amount_minor": 10_000,
                "occurred_at": "2024-01-05T12:00:00Z",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let income: TransactionView = json_body(response).await;
    assert_eq!(income.amount_minor, 10_000);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/transactions",
            Some(serde_json::json!({
                "account_id": account.id,
                "kind": "expense",
                "amount_minor": 2_500,
                "occurred_at": "2024-01-06T12:00:00Z",
                "note": "groceries",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/accounts/{}", account.id), None))
        .await
        .unwrap();
    let account: AccountView = json_body(response).await;
    assert_eq!(account.balance_minor, 7_500);

    let response = app
        .clone()
        .oneshot(request("GET", "/transactions?kinds=expense", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page: TransactionListResponse = json_body(response).await;
    assert_eq!(page.transactions.len(), 1);
    assert_eq!(page.transactions[0].note.as_deref(), Some("groceries"));

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/transactions/{}", income.id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/accounts/{}", account.id), None))
        .await
        .unwrap();
    let account: AccountView = json_body(response).await;
    assert_eq!(account.balance_minor, -2_500);
}

#[tokio::test]
async fn zero_amount_transaction_is_unprocessable() {
    let app = app().await;
    let account = create_account(&app, "Checking").await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/transactions",
            Some(serde_json::json!({
                "account_id": account.id,
                "kind": "expense",
                "amount_minor": 0,
                "occurred_at": "2024-01-06T12:00:00Z",
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn default_categories_are_listed_and_immutable() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(request("GET", "/categories", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let categories: Vec<CategoryView> = json_body(response).await;
    let groceries = categories
        .iter()
        .find(|c| c.name == "Groceries")
        .expect("seeded default missing");
    assert!(groceries.is_default);

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/categories/{}", groceries.id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn subscription_lifecycle() {
    let app = app().await;
    let account = create_account(&app, "Checking").await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/subscriptions",
            Some(serde_json::json!({
                "account_id": account.id,
                "name": "Streaming",
                "amount_minor": 1_999,
                "billing_cycle": "monthly",
                "next_billing_date": "2030-01-01T00:00:00Z",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let sub: SubscriptionView = json_body(response).await;
    assert!(sub.is_active);

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/subscriptions/{}", sub.id),
            Some(serde_json::json!({ "is_active": false })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let paused: SubscriptionView = json_body(response).await;
    assert!(!paused.is_active);

    let response = app
        .clone()
        .oneshot(request("GET", "/subscriptions", None))
        .await
        .unwrap();
    let active: Vec<SubscriptionView> = json_body(response).await;
    assert!(active.is_empty());

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/subscriptions?include_inactive=true",
            None,
        ))
        .await
        .unwrap();
    let all: Vec<SubscriptionView> = json_body(response).await;
    assert_eq!(all.len(), 1);

    let response = app
        .clone()
        .oneshot(request("DELETE", &format!("/subscriptions/{}", sub.id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
