//! Credential encryption using AES-GCM
//!
//! Stored passwords are encrypted reversibly so the session service can
//! compare them against a login attempt. The wire format is
//! `base64(IV(12 bytes) || ciphertext || tag(16 bytes))`; every call draws a
//! fresh IV from the OS random source.

use crate::keys::{CipherKey, IV_SIZE, TAG_SIZE};
use crate::{CryptoError, Result};
use aes_gcm::{
    aead::{consts::U12, Aead},
    aes::Aes192,
    Aes128Gcm, Aes256Gcm, AesGcm, KeyInit,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;

type Aes192Gcm = AesGcm<Aes192, U12>;

enum AesGcmCipher {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

impl AesGcmCipher {
    fn new(key: &CipherKey) -> Result<Self> {
        let bytes = key.as_bytes();
        match bytes.len() {
            16 => Aes128Gcm::new_from_slice(bytes)
                .map(Self::Aes128)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
            24 => Aes192Gcm::new_from_slice(bytes)
                .map(Self::Aes192)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
            32 => Aes256Gcm::new_from_slice(bytes)
                .map(Self::Aes256)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
            n => Err(CryptoError::InvalidKey(format!(
                "AES key must be 16, 24 or 32 bytes, got {}",
                n
            ))),
        }
    }

    fn algorithm_id(&self) -> &'static str {
        match self {
            Self::Aes128(_) => "AES-128-GCM",
            Self::Aes192(_) => "AES-192-GCM",
            Self::Aes256(_) => "AES-256-GCM",
        }
    }

    fn encrypt(&self, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = aes_gcm::Nonce::from_slice(iv);
        let sealed = match self {
            Self::Aes128(c) => c.encrypt(nonce, plaintext),
            Self::Aes192(c) => c.encrypt(nonce, plaintext),
            Self::Aes256(c) => c.encrypt(nonce, plaintext),
        };
        sealed.map_err(|e| CryptoError::Encryption(e.to_string()))
    }

    fn decrypt(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let nonce = aes_gcm::Nonce::from_slice(iv);
        let opened = match self {
            Self::Aes128(c) => c.decrypt(nonce, ciphertext),
            Self::Aes192(c) => c.decrypt(nonce, ciphertext),
            Self::Aes256(c) => c.decrypt(nonce, ciphertext),
        };
        opened.map_err(|_| CryptoError::Decryption("authentication tag mismatch".to_string()))
    }
}

/// Reversible authenticated encryption for stored credentials
pub struct CredentialCipher {
    cipher: AesGcmCipher,
}

impl CredentialCipher {
    /// Create a cipher for the given key
    pub fn new(key: &CipherKey) -> Result<Self> {
        Ok(Self {
            cipher: AesGcmCipher::new(key)?,
        })
    }

    /// Create from a Base64-encoded key
    pub fn from_base64(encoded_key: &str) -> Result<Self> {
        Self::new(&CipherKey::from_base64(encoded_key)?)
    }

    /// Encrypt `plaintext`, returning `base64(IV || ciphertext || tag)`
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut iv = [0u8; IV_SIZE];
        rand::RngCore::fill_bytes(&mut OsRng, &mut iv);

        let sealed = self.cipher.encrypt(&iv, plaintext.as_bytes())?;

        let mut message = Vec::with_capacity(IV_SIZE + sealed.len());
        message.extend_from_slice(&iv);
        message.extend_from_slice(&sealed);
        Ok(STANDARD.encode(message))
    }

    /// Decrypt a value produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails closed: bad Base64, input shorter than the IV, a tag mismatch
    /// or non-UTF-8 plaintext are all `CryptoError::Decryption`.
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let message = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::Decryption(format!("invalid base64: {}", e)))?;

        if message.len() < IV_SIZE {
            return Err(CryptoError::Decryption(format!(
                "ciphertext is {} bytes, shorter than the {}-byte IV",
                message.len(),
                IV_SIZE
            )));
        }
        if message.len() < IV_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption(
                "ciphertext is missing its authentication tag".to_string(),
            ));
        }

        let (iv, sealed) = message.split_at(IV_SIZE);
        let plaintext = self.cipher.decrypt(iv, sealed)?;

        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::Decryption("plaintext is not valid UTF-8".to_string()))
    }

    /// Get the algorithm identifier string
    pub fn algorithm_id(&self) -> &'static str {
        self.cipher.algorithm_id()
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialCipher({})", self.algorithm_id())
    }
}

/// Generate a Base64-encoded random AES key of `bits` bits (128, 192 or 256)
pub fn generate_base64_key(bits: usize) -> Result<String> {
    if ![128, 192, 256].contains(&bits) {
        return Err(CryptoError::Configuration(format!(
            "AES key size must be 128, 192 or 256 bits, got {}",
            bits
        )));
    }
    Ok(crate::keys::generate_base64_secret(bits))
}
