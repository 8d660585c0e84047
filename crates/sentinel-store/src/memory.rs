//! In-memory stores for tests and single-instance deployments

use crate::{BucketState, CredentialRecord, RateLimitStore, Result, StoreError, UserStore};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An in-memory token-bucket store
#[derive(Clone, Default)]
pub struct MemoryRateLimitStore {
    buckets: Arc<DashMap<String, BucketState>>,
}

impl MemoryRateLimitStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop all buckets
    pub fn clear(&self) {
        self.buckets.clear();
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn load_bucket(&self, key: &str) -> Result<Option<BucketState>> {
        Ok(self.buckets.get(key).map(|entry| *entry.value()))
    }

    async fn save_bucket(&self, key: &str, state: &BucketState) -> Result<()> {
        self.buckets.insert(key.to_string(), *state);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// An in-memory credential store
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<DashMap<String, CredentialRecord>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryUserStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<CredentialRecord>> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }

    async fn create(&self, username: &str, encrypted_password: &str) -> Result<CredentialRecord> {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(username.to_string())),
            Entry::Vacant(slot) => {
                let record = CredentialRecord {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                    username: username.to_string(),
                    encrypted_password: encrypted_password.to_string(),
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }
}
