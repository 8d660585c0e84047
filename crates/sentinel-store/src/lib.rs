//! # Sentinel Store
//!
//! Storage backends for the SentinelGate API gateway.
//!
//! This crate provides:
//! - **Rate-limit state**: Token-bucket state shared across gateway instances
//! - **Credential records**: Username and encrypted password lookup/creation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          AdmissionController            │
//! ├────────────────────┬────────────────────┤
//! │   RateLimitStore   │     UserStore      │
//! ├──────────┬─────────┼────────────────────┤
//! │  Redis   │ Memory  │      Memory        │
//! └──────────┴─────────┴────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use sentinel_store::{RateLimitStore, RedisConfig, RedisRateLimitStore};
//!
//! let store = RedisRateLimitStore::connect(RedisConfig::default()).await?;
//! let state = store.load_bucket("/orders").await?;
//! ```

pub mod error;
pub mod memory;
pub mod redis_store;

pub use error::{Result, StoreError};
pub use memory::{MemoryRateLimitStore, MemoryUserStore};
pub use redis_store::{RedisConfig, RedisRateLimitStore};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Persisted token-bucket state for one rate-limit key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketState {
    /// Tokens left in the bucket
    pub available_tokens: u32,
    /// Refill interval number (epoch millis / interval) of the last update
    pub last_refill_interval: i64,
}

/// A stored user credential
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Store-assigned identifier
    pub id: u64,
    /// Unique username
    pub username: String,
    /// Password encrypted by the credential cipher
    pub encrypted_password: String,
}

/// Shared state for the distributed token bucket
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Read the bucket for `key`, `None` if it was never written or has expired
    async fn load_bucket(&self, key: &str) -> Result<Option<BucketState>>;

    /// Persist the bucket for `key`
    async fn save_bucket(&self, key: &str, state: &BucketState) -> Result<()>;

    /// Short backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Credential storage used by the session service
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a record by username
    async fn find_by_username(&self, username: &str) -> Result<Option<CredentialRecord>>;

    /// Create a record, failing with `StoreError::AlreadyExists` on a duplicate username
    async fn create(&self, username: &str, encrypted_password: &str) -> Result<CredentialRecord>;
}
