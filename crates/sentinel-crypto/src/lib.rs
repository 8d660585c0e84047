//! # Sentinel Crypto
//!
//! Cryptographic primitives for the SentinelGate API gateway.
//!
//! This crate provides:
//! - **Session tokens**: HS256-signed JWTs carrying an opaque JSON payload
//! - **Credential encryption**: AES-GCM with a random 96-bit IV per call
//! - **Key loading**: fail-fast validation of configured key material
//!
//! ## Example
//!
//! ```rust,ignore
//! use sentinel_crypto::{CredentialCipher, SigningKey, TokenSigner};
//! use std::time::Duration;
//!
//! let signer = TokenSigner::new(SigningKey::generate(), Duration::from_secs(3600))?;
//! let token = signer.issue(&serde_json::json!({"username": "bob"}))?;
//! assert!(signer.validate(&token));
//!
//! let cipher = CredentialCipher::from_base64(&std::env::var("CIPHER_KEY")?)?;
//! let stored = cipher.encrypt("hunter2")?;
//! assert_eq!(cipher.decrypt(&stored)?, "hunter2");
//! ```

pub mod cipher;
pub mod error;
pub mod keys;
pub mod token;

pub use cipher::{generate_base64_key, CredentialCipher};
pub use error::{CryptoError, Result};
pub use keys::{generate_base64_secret, CipherKey, SigningKey};
pub use token::TokenSigner;
