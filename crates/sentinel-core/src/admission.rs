//! Per-route admission control
//!
//! Two interchangeable strategies decide whether a request may proceed:
//!
//! - a **distributed token bucket** whose state lives in a [`RateLimitStore`]
//!   shared by every gateway instance, and
//! - a **local sliding window** of expiry timestamps, used whenever the store
//!   is missing, slow or failing.
//!
//! The bucket update is a plain read-then-write. Two instances racing on the
//! same key can both admit, so the bucket is a soft limit, not a hard cap.

use crate::{CoreError, Result};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use sentinel_store::{BucketState, RateLimitStore};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Rate limiting configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Master switch; when false every request is admitted
    pub enabled: bool,
    /// Tokens added to a bucket per refill interval
    pub tokens_per_interval: u32,
    /// Bucket capacity, also the local window size
    pub max_tokens: u32,
    /// Lifetime of one local window entry in milliseconds
    pub window_ttl_ms: u64,
    /// Length of one refill interval in milliseconds
    pub refill_interval_ms: u64,
    /// Deadline for each distributed store call in milliseconds
    pub store_timeout_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tokens_per_interval: 3,
            max_tokens: 7,
            window_ttl_ms: 3600,
            refill_interval_ms: 3000,
            store_timeout_ms: 100,
        }
    }
}

impl RateLimitConfig {
    /// Reject values that would make the limiter meaningless
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(CoreError::InvalidConfig(
                "rate_limit.max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.tokens_per_interval == 0 {
            return Err(CoreError::InvalidConfig(
                "rate_limit.tokens_per_interval must be greater than 0".to_string(),
            ));
        }
        if self.refill_interval_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "rate_limit.refill_interval_ms must be greater than 0".to_string(),
            ));
        }
        if i64::try_from(self.refill_interval_ms).is_err()
            || i64::try_from(self.window_ttl_ms).is_err()
        {
            return Err(CoreError::InvalidConfig(
                "rate_limit intervals are out of range".to_string(),
            ));
        }
        Ok(())
    }

    /// Store call deadline
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// How long a distributed bucket must outlive its last write.
    ///
    /// Covers the time an empty bucket needs to refill completely plus one
    /// spare interval, so an expired bucket is always indistinguishable from
    /// a full one.
    pub fn bucket_ttl(&self) -> Duration {
        let per_interval = u64::from(self.tokens_per_interval.max(1));
        let intervals = u64::from(self.max_tokens).div_ceil(per_interval) + 1;
        Duration::from_millis(intervals.saturating_mul(self.refill_interval_ms.max(1)))
    }

    /// Refill interval number that `now_ms` falls in
    pub fn interval_of(&self, now_ms: i64) -> i64 {
        now_ms.div_euclid(self.refill_interval_ms.max(1) as i64)
    }
}

/// Advance a bucket to `now_interval` and try to take one token.
///
/// Returns the state to persist when the request is admitted, `None` when the
/// bucket is empty. A missing bucket starts full. Elapsed time is clamped at
/// zero, so a clock stepping backwards never drains a bucket.
pub fn take_token(
    current: Option<BucketState>,
    now_interval: i64,
    config: &RateLimitConfig,
) -> Option<BucketState> {
    let capacity = u64::from(config.max_tokens);
    let refilled = match current {
        None => capacity,
        Some(state) => {
            let elapsed = now_interval
                .saturating_sub(state.last_refill_interval)
                .max(0) as u64;
            let added = elapsed.saturating_mul(u64::from(config.tokens_per_interval));
            u64::from(state.available_tokens)
                .saturating_add(added)
                .min(capacity)
        }
    };

    if refilled == 0 {
        return None;
    }

    Some(BucketState {
        // refilled <= max_tokens, which is a u32
        available_tokens: (refilled - 1) as u32,
        last_refill_interval: now_interval,
    })
}

type Window = Arc<Mutex<VecDeque<i64>>>;

/// Decides whether a request for a given route key may proceed
pub struct AdmissionController {
    config: RateLimitConfig,
    store: Option<Arc<dyn RateLimitStore>>,
    windows: DashMap<String, Window>,
    last_sweep_ms: AtomicI64,
}

impl AdmissionController {
    /// Create a controller; `store` enables the distributed strategy
    pub fn new(config: RateLimitConfig, store: Option<Arc<dyn RateLimitStore>>) -> Self {
        Self {
            config,
            store,
            windows: DashMap::new(),
            last_sweep_ms: AtomicI64::new(i64::MIN),
        }
    }

    /// Create a controller that only uses the local sliding window
    pub fn local_only(config: RateLimitConfig) -> Self {
        Self::new(config, None)
    }

    /// Active configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether a distributed store is attached
    pub fn is_distributed(&self) -> bool {
        self.store.is_some()
    }

    /// Number of keys currently holding a local window
    pub fn local_key_count(&self) -> usize {
        self.windows.len()
    }

    /// Decide whether a request for `key` may proceed, using the wall clock
    pub async fn is_allowed(&self, key: &str) -> bool {
        self.is_allowed_at(key, Utc::now().timestamp_millis()).await
    }

    /// Decide whether a request for `key` may proceed at `now_ms`.
    ///
    /// Never fails. Store errors fall through to the local window; errors in
    /// the local window admit the request.
    pub async fn is_allowed_at(&self, key: &str, now_ms: i64) -> bool {
        if !self.config.enabled {
            return true;
        }

        if let Some(store) = &self.store {
            match self.check_distributed(store.as_ref(), key, now_ms).await {
                Ok(allowed) => {
                    tracing::debug!(key, allowed, backend = store.backend_name(), "Token bucket decision");
                    return allowed;
                }
                Err(e) => {
                    tracing::warn!(
                        key,
                        error = %e,
                        backend = store.backend_name(),
                        "Distributed rate limit unavailable, using local window"
                    );
                }
            }
        }

        let allowed = self.check_local(key, now_ms);
        tracing::debug!(key, allowed, "Sliding window decision");
        allowed
    }

    async fn check_distributed(
        &self,
        store: &dyn RateLimitStore,
        key: &str,
        now_ms: i64,
    ) -> Result<bool> {
        let deadline = self.config.store_timeout();
        let timed_out = || CoreError::StoreTimeout(self.config.store_timeout_ms);

        let current = tokio::time::timeout(deadline, store.load_bucket(key))
            .await
            .map_err(|_| timed_out())??;

        let Some(next) = take_token(current, self.config.interval_of(now_ms), &self.config) else {
            return Ok(false);
        };

        tokio::time::timeout(deadline, store.save_bucket(key, &next))
            .await
            .map_err(|_| timed_out())??;
        Ok(true)
    }

    fn check_local(&self, key: &str, now_ms: i64) -> bool {
        self.sweep_expired(now_ms);

        let window = self.window(key);
        let mut expiries = window.lock();

        while expiries.front().is_some_and(|&expiry| expiry < now_ms) {
            expiries.pop_front();
        }

        if expiries.len() >= self.config.max_tokens as usize {
            return false;
        }

        let expiry = i64::try_from(self.config.window_ttl_ms)
            .ok()
            .and_then(|ttl| now_ms.checked_add(ttl));
        match expiry {
            Some(expiry) => expiries.push_back(expiry),
            None => {
                tracing::error!(key, now_ms, "Sliding window expiry overflowed, admitting request");
            }
        }
        true
    }

    /// Drop windows whose entries have all expired, at most once per window TTL
    fn sweep_expired(&self, now_ms: i64) {
        let period = i64::try_from(self.config.window_ttl_ms).unwrap_or(i64::MAX).max(1);
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) < period {
            return;
        }
        if self
            .last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let before = self.windows.len();
        self.windows.retain(|_, window| {
            // A window cloned out of the map may be about to record an entry
            if Arc::strong_count(window) > 1 {
                return true;
            }
            let mut expiries = window.lock();
            while expiries.front().is_some_and(|&expiry| expiry < now_ms) {
                expiries.pop_front();
            }
            !expiries.is_empty()
        });

        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.windows.len(), "Swept expired local windows");
        }
    }

    fn window(&self, key: &str) -> Window {
        if let Some(window) = self.windows.get(key) {
            return Arc::clone(window.value());
        }
        Arc::clone(self.windows.entry(key.to_string()).or_default().value())
    }
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("config", &self.config)
            .field("distributed", &self.is_distributed())
            .field("local_keys", &self.windows.len())
            .finish()
    }
}
