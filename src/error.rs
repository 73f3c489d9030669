//! Centralized error types for momocheck.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the momocheck library.
///
/// Soft skips (non-HTML bodies, foreign senders, incomplete notifications)
/// are not errors: they surface as a `None` outcome instead.
#[derive(Error, Debug)]
pub enum CheckerError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No cache entry exists for the given message id.
    #[error("No cache entry for message '{0}'")]
    NotFound(String),

    /// The transaction time did not match the contractual `dd/mm/YYYY HH:MM` format.
    #[error("Invalid transaction date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    /// The received amount is not a base-10 integer.
    #[error("Invalid transaction amount '{0}'")]
    InvalidAmount(String),

    /// A cache file could not be encoded or decoded.
    #[error("Corrupt cache entry '{path}': {reason}")]
    Serialization { path: PathBuf, reason: String },

    /// The message source returned a document we cannot turn into a message.
    #[error("Malformed message '{id}': {reason}")]
    InvalidMessage { id: String, reason: String },

    /// The message source failed (network, auth, missing mailbox...).
    #[error("Message source error: {0}")]
    Source(String),
}

/// Convenience alias for `Result<T, CheckerError>`.
pub type Result<T> = std::result::Result<T, CheckerError>;

impl CheckerError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `CheckerError::io`).
impl From<std::io::Error> for CheckerError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
