//! Error type shared by every POS operation.
//!
//! Validation-style variants are returned before any state is touched.
//! Storage and serialization variants wrap adapter failures. IPC commands
//! turn the error into its `Display` string for the frontend toast.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PosError {
    #[error("{0}")]
    Validation(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Too many failed login attempts, try again in {minutes_left} minutes")]
    LockedOut { minutes_left: i64 },

    #[error("storage: {0}")]
    Storage(String),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type PosResult<T> = Result<T, PosError>;

impl PosError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PosError::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        PosError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for PosError {
    fn from(e: rusqlite::Error) -> Self {
        PosError::Storage(e.to_string())
    }
}

impl From<std::io::Error> for PosError {
    fn from(e: std::io::Error) -> Self {
        PosError::Storage(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PosError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PosError::Storage(format!("lock poisoned: {e}"))
    }
}

impl From<PosError> for String {
    fn from(e: PosError) -> Self {
        e.to_string()
    }
}
