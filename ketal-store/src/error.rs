//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A record with the same name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The record was rejected before reaching the backend.
    #[error("invalid record: {0}")]
    Invalid(String),

    /// The backend answered with an unexpected status.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The backend could not be reached.
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response body could not be decoded.
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    /// A watch subscriber fell behind and missed events. Re-subscribe and
    /// re-list to recover.
    #[error("watch lagged, {0} events missed")]
    Lagged(u64),

    /// Backend configuration is missing or unreadable.
    #[error("config: {0}")]
    Config(String),
}

impl StoreError {
    /// True when a create collided with an existing record.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }

    /// True when the record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
