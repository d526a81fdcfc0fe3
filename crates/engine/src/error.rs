//! The module contains the errors the engine can throw.
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Immutable: {0}")]
    Immutable(String),
    #[error("Reconciliation failure: {0}")]
    Reconciliation(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::Immutable(a), Self::Immutable(b)) => a == b,
            (Self::Reconciliation(a), Self::Reconciliation(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
