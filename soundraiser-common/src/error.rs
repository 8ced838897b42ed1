//! Common error types for Soundraiser

use thiserror::Error;

/// Common result type for Soundraiser operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Soundraiser services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote backend unreachable or returned an error
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error means the requested record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True when the error came from the data backend (database or HTTP API)
    ///
    /// Callers may retry these; nothing in this workspace retries internally.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Upstream(_))
    }
}
