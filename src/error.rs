//! Error types for AcadPay
//!
//! This module provides the crate-level error hierarchy using `thiserror`.
//! Verification failures carry their own taxonomy in
//! [`crate::payment::error`]; this type wraps them together with the
//! ambient failure modes (configuration, store, IO, JSON).

use thiserror::Error;

/// The main error type for AcadPay operations
#[derive(Error, Debug)]
pub enum Error {
    /// Verification pipeline errors
    #[error("Verification error: {0}")]
    Verification(#[from] crate::payment::error::VerificationError),

    /// Persistence collaborator errors
    #[error("Store error: {0}")]
    Store(#[from] crate::payment::store::StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for AcadPay operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }
}
