//! Error types for the sentinel-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key material was not configured
    #[error("missing key: {0}")]
    MissingKey(String),

    /// Invalid key format or length
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Invalid construction parameters
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Token signing failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// Token failed verification or carried no payload
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Encryption failed
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (tampered, truncated or malformed input)
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Base64 decode error
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
