//! Common error types for the gallery

use thiserror::Error;

use crate::models::ItemId;

/// Common result type for gallery operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the gallery crates
#[derive(Error, Debug)]
pub enum Error {
    /// Backing store unreachable or returned a malformed response
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Item identifier does not exist in the store
    #[error("Invalid item: {0}")]
    InvalidItem(ItemId),

    /// Category slug is not part of the known vocabulary
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Malformed write request
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors a filtering session should treat as non-fatal
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::UpstreamUnavailable(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::UpstreamUnavailable(format!("database: {}", err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::UpstreamUnavailable(format!("http: {}", err))
    }
}
