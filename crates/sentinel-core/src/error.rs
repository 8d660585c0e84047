//! Error types for the sentinel-core crate

use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in core gateway components
#[derive(Error, Debug)]
pub enum CoreError {
    /// Route definition rejected at startup
    #[error("invalid route for service '{service}': {reason}")]
    InvalidRoute { service: String, reason: String },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Store operation exceeded its deadline
    #[error("store operation timed out after {0}ms")]
    StoreTimeout(u64),

    /// Store error
    #[error("store error: {0}")]
    Store(#[from] sentinel_store::StoreError),

    /// Crypto error
    #[error("crypto error: {0}")]
    Crypto(#[from] sentinel_crypto::CryptoError),
}
