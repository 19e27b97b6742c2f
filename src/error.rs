//! Error types for the Tollgate service.

use std::time::Duration;

use thiserror::Error;

/// Main error type for Tollgate operations.
#[derive(Error, Debug)]
pub enum TollgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tier name that is not part of the policy catalogue
    #[error("Unknown rate limit tier: {0}")]
    UnknownTier(String),

    /// A policy with a zero quota or an empty window
    #[error("Invalid rate limit policy: {0}")]
    InvalidPolicy(String),

    /// Counter store errors
    #[error("Counter store error: {0}")]
    Store(#[from] StoreError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for TollgateError {
    fn from(err: config::ConfigError) -> Self {
        TollgateError::Config(err.to_string())
    }
}

/// Errors raised by a counter store while answering a check.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The Redis backend rejected the call or could not be reached
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The backend did not answer within the configured bound
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias for Tollgate operations.
pub type Result<T> = std::result::Result<T, TollgateError>;
