//! Application state

use crate::config::GatewayConfig;
use crate::forward::ProxyForwarder;
use crate::gate::RequestGate;
use sentinel_core::{AdmissionController, AuthSessionService, ServiceResolver};
use sentinel_crypto::{CipherKey, CredentialCipher, TokenSigner};
use sentinel_store::{MemoryUserStore, RateLimitStore, RedisConfig, RedisRateLimitStore, UserStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared across handlers
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// Authentication and admission filter
    pub gate: RequestGate,
    /// Upstream forwarder
    pub forwarder: ProxyForwarder,
    /// Login and signup
    pub sessions: AuthSessionService,
}

impl AppState {
    /// Build every component from configuration.
    ///
    /// Bad key material, routes or Redis URL are fatal. An unreachable Redis
    /// is not: the store keeps reconnecting and the local window covers the
    /// gap.
    pub async fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let signer = TokenSigner::from_config(
            config.jwt_secret.as_deref(),
            config.token_ttl(),
            config.allow_ephemeral_keys,
        )?;
        let cipher = Self::create_cipher(&config)?;
        let registry = config.build_registry()?;
        info!(services = ?registry.service_keys(), "Service registry loaded");

        let store = Self::create_rate_limit_store(&config).await?;
        let admission = AdmissionController::new(config.rate_limit.clone(), store);

        warn!("⚠ User store: in-memory (accounts are lost on restart)");
        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());

        Self::from_parts(
            config,
            Arc::new(signer),
            Arc::new(cipher),
            users,
            Arc::new(admission),
            Arc::new(registry),
        )
    }

    /// Assemble state from already built components
    pub fn from_parts(
        config: GatewayConfig,
        signer: Arc<TokenSigner>,
        cipher: Arc<CredentialCipher>,
        users: Arc<dyn UserStore>,
        admission: Arc<AdmissionController>,
        resolver: Arc<dyn ServiceResolver>,
    ) -> anyhow::Result<Self> {
        let gate = RequestGate::new(&config.bypass_patterns, Arc::clone(&signer), admission);
        let forwarder = ProxyForwarder::new(resolver)?;
        let sessions = AuthSessionService::new(users, cipher, signer);

        Ok(Self {
            config,
            gate,
            forwarder,
            sessions,
        })
    }

    fn create_cipher(config: &GatewayConfig) -> anyhow::Result<CredentialCipher> {
        match config.cipher_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Ok(CredentialCipher::from_base64(key)?),
            None if config.allow_ephemeral_keys => {
                warn!("⚠️  No cipher key configured; using an EPHEMERAL key. Stored passwords will be unreadable after a restart!");
                Ok(CredentialCipher::new(&CipherKey::generate())?)
            }
            None => anyhow::bail!(
                "cipher key is not configured; provide a Base64 AES key (generate one with `sentinel-gateway --generate-secret`)"
            ),
        }
    }

    async fn create_rate_limit_store(
        config: &GatewayConfig,
    ) -> anyhow::Result<Option<Arc<dyn RateLimitStore>>> {
        if !config.rate_limit.enabled {
            warn!("⚠️  Rate limiting is DISABLED");
            return Ok(None);
        }

        let Some(url) = config.redis_url.clone() else {
            info!("No Redis configured; rate limiting uses local windows only");
            return Ok(None);
        };

        let redis_config = RedisConfig {
            url,
            op_timeout: config.rate_limit.store_timeout(),
            entry_ttl: config.rate_limit.bucket_ttl(),
            ..Default::default()
        };
        let store = RedisRateLimitStore::new(redis_config)?;
        match store.warm_up().await {
            Ok(()) => info!("✓ Rate limiting: distributed (Redis) with local fallback"),
            Err(e) => warn!(
                error = %e,
                "Redis unreachable at startup; using local windows until it connects"
            ),
        }
        Ok(Some(Arc::new(store)))
    }
}
