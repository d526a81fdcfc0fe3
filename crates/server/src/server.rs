use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, patch},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{accounts, categories, subscriptions, transactions, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(auth_header) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/accounts", get(accounts::list).post(accounts::create))
        .route(
            "/accounts/{id}",
            get(accounts::get)
                .patch(accounts::rename)
                .delete(accounts::remove),
        )
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/{id}",
            patch(categories::rename).delete(categories::remove),
        )
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .patch(transactions::update)
                .delete(transactions::remove),
        )
        .route(
            "/subscriptions",
            get(subscriptions::list).post(subscriptions::create),
        )
        .route(
            "/subscriptions/{id}",
            get(subscriptions::get)
                .patch(subscriptions::update)
                .delete(subscriptions::remove),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection, bind: &str, port: u16) {
    let listener = match tokio::net::TcpListener::bind((bind, port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
