//! Common error types for Callboard services

use thiserror::Error;

/// Common result type for Callboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Callboard services
///
/// Validation and Conflict are recoverable and carry enough detail to
/// identify the offending field; NotFound and Unauthorized are terminal
/// for the request.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
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

    /// Rejected input, named after the field definition or submitted field
    /// that caused the rejection
    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// Operation conflicts with existing data (e.g. deleting a field that
    /// still has stored values, or a uniqueness violation)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a validation error naming the offending field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
