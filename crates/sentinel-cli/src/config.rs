//! Gateway configuration
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML
//! file, `SENTINEL__*` environment variables, then command-line flags.

use config::{Config, Environment, File, FileFormat};
use sentinel_core::{RateLimitConfig, ServiceRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for configuration keys
pub const ENV_PREFIX: &str = "SENTINEL";

fn default_timeout_ms() -> u64 {
    30_000
}

/// One upstream service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base address, e.g. `http://localhost:8081`
    pub base_url: String,
    /// Per-call upstream timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Gateway server configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base64 HMAC secret for session tokens
    pub jwt_secret: Option<String>,
    /// Session token lifetime
    pub token_ttl_secs: u64,
    /// Base64 AES key for stored credentials
    pub cipher_key: Option<String>,
    /// Generate throwaway keys when secrets are missing (development only)
    pub allow_ephemeral_keys: bool,
    /// Redis URL for the distributed rate limiter
    pub redis_url: Option<String>,
    /// Rate limiting
    pub rate_limit: RateLimitConfig,
    /// Path globs that skip authentication
    pub bypass_patterns: Vec<String>,
    /// Upstream services keyed by the first path segment
    pub services: BTreeMap<String, ServiceConfig>,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: None,
            token_ttl_secs: 3600,
            cipher_key: None,
            allow_ephemeral_keys: false,
            redis_url: None,
            rate_limit: RateLimitConfig::default(),
            bypass_patterns: vec!["/auth/**".to_string(), "/health".to_string()],
            services: BTreeMap::new(),
            max_body_size: 10 * 1024 * 1024, // 10 MB
            cors_enabled: true,
        }
    }
}

// Secrets stay out of logs
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &Option<String>| s.as_ref().map(|_| "<redacted>");
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &redact(&self.jwt_secret))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("cipher_key", &redact(&self.cipher_key))
            .field("allow_ephemeral_keys", &self.allow_ephemeral_keys)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "<set>"))
            .field("rate_limit", &self.rate_limit)
            .field("bypass_patterns", &self.bypass_patterns)
            .field("services", &self.services)
            .field("max_body_size", &self.max_body_size)
            .field("cors_enabled", &self.cors_enabled)
            .finish()
    }
}

/// Values supplied on the command line; `None` leaves the loaded value alone
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub redis_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub cipher_key: Option<String>,
    pub token_ttl_secs: Option<u64>,
    pub disable_rate_limit: bool,
    pub allow_ephemeral_keys: bool,
}

impl GatewayConfig {
    /// Load defaults, then `path` (if any), then `SENTINEL__*` variables
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> anyhow::Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        let config: Self = builder.add_source(env).build()?.try_deserialize()?;
        Ok(config)
    }

    /// Apply command-line values on top of the loaded configuration
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if overrides.redis_url.is_some() {
            self.redis_url = overrides.redis_url;
        }
        if overrides.jwt_secret.is_some() {
            self.jwt_secret = overrides.jwt_secret;
        }
        if overrides.cipher_key.is_some() {
            self.cipher_key = overrides.cipher_key;
        }
        if let Some(ttl) = overrides.token_ttl_secs {
            self.token_ttl_secs = ttl;
        }
        if overrides.disable_rate_limit {
            self.rate_limit.enabled = false;
        }
        if overrides.allow_ephemeral_keys {
            self.allow_ephemeral_keys = true;
        }
    }

    /// Check everything that does not need key material or the network
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.token_ttl_secs == 0 {
            anyhow::bail!("token_ttl_secs must be greater than 0");
        }
        if self.max_body_size == 0 {
            anyhow::bail!("max_body_size must be greater than 0");
        }
        self.rate_limit.validate()?;
        self.build_registry()?;
        Ok(())
    }

    /// Build the service registry from the `services` table
    pub fn build_registry(&self) -> sentinel_core::Result<ServiceRegistry> {
        let mut registry = ServiceRegistry::new();
        for (key, service) in &self.services {
            registry.insert(key, &service.base_url, Duration::from_millis(service.timeout_ms))?;
        }
        Ok(registry)
    }

    /// Session token lifetime
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
