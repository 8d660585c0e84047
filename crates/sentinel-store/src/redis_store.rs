//! Redis-backed token-bucket store
//!
//! Buckets are stored as JSON under `<prefix>:<key>` with an expiry, so keys
//! that stop receiving traffic are evicted by Redis itself. Every command is
//! bounded by `op_timeout`.
//!
//! The connection is opened on first use. A failed attempt leaves the store
//! unconnected and the next command tries again, so a gateway started while
//! Redis is down picks it up once it is back.

use crate::{BucketState, RateLimitStore, Result, StoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Redis connection settings
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379`
    pub url: String,
    /// Prefix prepended to every bucket key
    pub key_prefix: String,
    /// Upper bound on a single command and on each connect attempt
    pub op_timeout: Duration,
    /// Expiry applied on every write
    pub entry_ttl: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "rate_limit".to_string(),
            op_timeout: Duration::from_millis(100),
            entry_ttl: Duration::from_secs(3600),
        }
    }
}

/// Token-bucket store shared by every gateway instance
pub struct RedisRateLimitStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    config: RedisConfig,
}

impl RedisRateLimitStore {
    /// Create a store without touching the network.
    ///
    /// Only the configuration is checked here: the URL must parse and the
    /// operation timeout must be non-zero.
    pub fn new(config: RedisConfig) -> Result<Self> {
        if config.op_timeout.is_zero() {
            return Err(StoreError::Configuration(
                "redis operation timeout must be non-zero".to_string(),
            ));
        }

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::Configuration(format!("invalid redis url: {}", e)))?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
            config,
        })
    }

    /// Create a store and connect right away, failing if Redis is unreachable
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        let store = Self::new(config)?;
        store.warm_up().await?;
        Ok(store)
    }

    /// Try to establish the connection now instead of on the first command
    pub async fn warm_up(&self) -> Result<()> {
        self.connection().await.map(|_| ())
    }

    /// Whether a connection has been established
    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let conn = self.bounded(ConnectionManager::new(self.client.clone())).await?;
                tracing::info!(prefix = %self.config.key_prefix, "Connected to Redis rate-limit store");
                Ok::<_, StoreError>(conn)
            })
            .await?;
        Ok(conn.clone())
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }

    async fn bounded<T>(&self, fut: impl Future<Output = RedisResult<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.op_timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout {
                millis: self.config.op_timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn load_bucket(&self, key: &str) -> Result<Option<BucketState>> {
        let mut conn = self.connection().await?;
        let key = self.key(key);
        let raw: Option<String> = self.bounded(conn.get(&key)).await?;

        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| StoreError::Deserialization(e.to_string()))
        })
        .transpose()
    }

    async fn save_bucket(&self, key: &str, state: &BucketState) -> Result<()> {
        let mut conn = self.connection().await?;
        let key = self.key(key);
        let json = serde_json::to_string(state)?;
        let ttl_secs = ttl_seconds(self.config.entry_ttl);
        self.bounded(conn.set_ex::<_, _, ()>(&key, json, ttl_secs))
            .await
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Expiry in whole seconds, rounded up and never zero
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

impl std::fmt::Debug for RedisRateLimitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRateLimitStore")
            .field("key_prefix", &self.config.key_prefix)
            .field("op_timeout", &self.config.op_timeout)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
