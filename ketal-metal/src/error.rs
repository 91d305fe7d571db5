//! Equinix Metal client errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetalError {
    /// The request could not be sent or the response not read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("api error ({status}): {}", .errors.join("; "))]
    Api { status: u16, errors: Vec<String> },

    /// Client configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MetalError {
    /// True when the API rejected a create because the resource already exists.
    ///
    /// Duplicate hostnames come back as 422 with a validation message, not as
    /// a 409.
    pub fn is_already_exists(&self) -> bool {
        match self {
            MetalError::Api { status: 409, .. } => true,
            MetalError::Api { status: 422, errors } => errors.iter().any(|e| {
                let e = e.to_ascii_lowercase();
                e.contains("already") || e.contains("has been taken")
            }),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MetalError::Api { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, MetalError>;
