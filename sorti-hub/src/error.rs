//! Error types for sorti-hub
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for the hub service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Contended resource (occupied bin, duplicate session, award in flight)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource not found (unknown bin, user, group or session)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected input (malformed scan payload, unknown category, bad volume)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Operation not allowed from the session's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Operation requires a capability the caller's role lacks
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sorti_common::Error> for Error {
    fn from(err: sorti_common::Error) -> Self {
        match err {
            sorti_common::Error::Database(e) => Error::Database(e),
            sorti_common::Error::Io(e) => Error::Io(e),
            sorti_common::Error::Config(msg) => Error::Config(msg),
            sorti_common::Error::NotFound(msg) => Error::NotFound(msg),
            sorti_common::Error::InvalidInput(msg) => Error::Validation(msg),
            sorti_common::Error::Internal(msg) => Error::Internal(msg),
        }
    }
}

/// Convenience Result type using the hub Error
pub type Result<T> = std::result::Result<T, Error>;
