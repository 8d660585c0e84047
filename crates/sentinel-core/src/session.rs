//! Login and signup
//!
//! Passwords are stored encrypted with the credential cipher and compared
//! after decryption. Successful calls return a session token whose payload is
//! the caller's [`UserIdentity`].

use crate::CoreError;
use sentinel_crypto::{CredentialCipher, TokenSigner};
use sentinel_store::{CredentialRecord, StoreError, UserStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Message returned for any credential mismatch
pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";

/// Identity embedded in every session token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: u64,
    pub username: String,
}

impl From<&CredentialRecord> for UserIdentity {
    fn from(record: &CredentialRecord) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
        }
    }
}

/// Outcome of a failed session operation
#[derive(Error, Debug)]
pub enum SessionError {
    /// Malformed request, e.g. a blank field on signup
    #[error("{0}")]
    Invalid(String),

    /// Missing or wrong credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Store or crypto failure; the detail is for logs only
    #[error("session operation failed: {0}")]
    Internal(#[from] CoreError),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Internal(err.into())
    }
}

impl From<sentinel_crypto::CryptoError> for SessionError {
    fn from(err: sentinel_crypto::CryptoError) -> Self {
        SessionError::Internal(err.into())
    }
}

/// Issues session tokens for registered users
#[derive(Clone)]
pub struct AuthSessionService {
    users: Arc<dyn UserStore>,
    cipher: Arc<CredentialCipher>,
    signer: Arc<TokenSigner>,
}

impl AuthSessionService {
    /// Wire the service to its collaborators
    pub fn new(users: Arc<dyn UserStore>, cipher: Arc<CredentialCipher>, signer: Arc<TokenSigner>) -> Self {
        Self { users, cipher, signer }
    }

    /// Authenticate an existing user and issue a token
    pub async fn login(&self, username: &str, password: &str) -> Result<String, SessionError> {
        tracing::info!(username, "Login request");
        if let Some(message) = blank_field(username, password) {
            return Err(SessionError::Unauthorized(message));
        }

        let record = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| SessionError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        self.check_and_issue(&record, password)
    }

    /// Register a new user and issue a token.
    ///
    /// An existing username is treated as a login against the stored record
    /// rather than rejected.
    pub async fn signup(&self, username: &str, password: &str) -> Result<String, SessionError> {
        tracing::info!(username, "Signup request");
        if let Some(message) = blank_field(username, password) {
            return Err(SessionError::Invalid(message));
        }

        if let Some(existing) = self.users.find_by_username(username).await? {
            return self.check_and_issue(&existing, password);
        }

        let encrypted = self.cipher.encrypt(password)?;
        match self.users.create(username, &encrypted).await {
            Ok(record) => {
                tracing::info!(username, user_id = record.id, "User registered");
                Ok(self.signer.issue(&UserIdentity::from(&record))?)
            }
            // Lost a race with a concurrent signup for the same name
            Err(StoreError::AlreadyExists(_)) => {
                let existing = self
                    .users
                    .find_by_username(username)
                    .await?
                    .ok_or_else(|| StoreError::Connection("record vanished after conflict".to_string()))?;
                self.check_and_issue(&existing, password)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Recover the identity carried by a token
    pub fn identify(&self, token: &str) -> Result<UserIdentity, SessionError> {
        self.signer.decode(token).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            SessionError::Unauthorized("Unauthorized".to_string())
        })
    }

    /// Check a token without decoding its payload
    pub fn validate(&self, token: &str) -> bool {
        self.signer.validate(token)
    }

    fn check_and_issue(&self, record: &CredentialRecord, password: &str) -> Result<String, SessionError> {
        let stored = self.cipher.decrypt(&record.encrypted_password)?;
        if stored != password {
            tracing::info!(username = %record.username, "Credential mismatch");
            return Err(SessionError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        Ok(self.signer.issue(&UserIdentity::from(record))?)
    }
}

impl std::fmt::Debug for AuthSessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSessionService")
            .field("cipher", &self.cipher)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

fn blank_field(username: &str, password: &str) -> Option<String> {
    if username.trim().is_empty() {
        Some("username cannot be empty.".to_string())
    } else if password.trim().is_empty() {
        Some("password cannot be empty.".to_string())
    } else {
        None
    }
}
