//! Key material for token signing and credential encryption
//!
//! Keys are loaded once at startup. Anything too short or malformed is
//! rejected here so the hot path never has to re-check key quality.

use crate::{CryptoError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum HMAC-SHA-256 key size in bytes (256 bits)
pub const MIN_SIGNING_KEY_SIZE: usize = 32;

/// AES key sizes accepted by the credential cipher (128, 192 and 256 bits)
pub const CIPHER_KEY_SIZES: [usize; 3] = [16, 24, 32];

/// Size of the AES-GCM IV in bytes (96 bits)
pub const IV_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// HMAC secret used to sign session tokens
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey {
    bytes: Vec<u8>,
}

impl SigningKey {
    /// Generate a new random 256-bit signing key
    pub fn generate() -> Self {
        Self {
            bytes: random_bytes(MIN_SIGNING_KEY_SIZE),
        }
    }

    /// Create a signing key from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_SIGNING_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "signing key is {} bytes ({} bits), HS256 requires at least {} bytes; \
                 generate one with `sentinel-gateway --generate-secret`",
                bytes.len(),
                bytes.len() * 8,
                MIN_SIGNING_KEY_SIZE
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Parse a configured secret.
    ///
    /// The secret is expected to be standard Base64. A value that does not
    /// decode is used as raw UTF-8 bytes, with a warning. The length check
    /// applies either way.
    pub fn from_config(secret: &str) -> Result<Self> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(CryptoError::MissingKey("signing secret is empty".to_string()));
        }

        match STANDARD.decode(secret) {
            Ok(decoded) => Self::from_bytes(&decoded),
            Err(_) => {
                tracing::warn!(
                    "signing secret is not valid Base64; falling back to raw UTF-8 bytes (not recommended)"
                );
                Self::from_bytes(secret.as_bytes())
            }
        }
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Key length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false for a constructed key
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey({} bytes)", self.bytes.len())
    }
}

/// AES key used to encrypt stored credentials
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey {
    bytes: Vec<u8>,
}

impl CipherKey {
    /// Generate a new random AES-256 key
    pub fn generate() -> Self {
        Self {
            bytes: random_bytes(32),
        }
    }

    /// Create from raw bytes (16, 24 or 32 bytes)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if !CIPHER_KEY_SIZES.contains(&bytes.len()) {
            return Err(CryptoError::InvalidKey(format!(
                "AES key must be 16, 24 or 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Decode from base64
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(CryptoError::MissingKey("cipher key is empty".to_string()));
        }
        let bytes = STANDARD.decode(encoded)?;
        Self::from_bytes(&bytes)
    }

    /// Encode as base64
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CipherKey(AES-{})", self.bytes.len() * 8)
    }
}

/// Generate a Base64-encoded random secret of `bits` bits.
///
/// Meant for operators provisioning a deployment, not for runtime use.
pub fn generate_base64_secret(bits: usize) -> String {
    STANDARD.encode(random_bytes(bits.div_ceil(8)))
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::RngCore::fill_bytes(&mut OsRng, &mut bytes);
    bytes
}
