use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod accounts;
mod categories;
mod server;
mod subscriptions;
mod transactions;
mod user;
pub mod types;

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Immutable(_) => StatusCode::FORBIDDEN,
        EngineError::Database(_) | EngineError::Reconciliation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        EngineError::InvalidAmount(_)
        | EngineError::InvalidName(_)
        | EngineError::InvalidId(_)
        | EngineError::CurrencyMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Reconciliation(detail) => {
            tracing::error!("reconciliation error: {detail}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
