//! SentinelGate - API gateway

use clap::Parser;
use sentinel_cli::{run_server, ConfigOverrides, GatewayConfig};
use sentinel_crypto::{generate_base64_key, generate_base64_secret};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sentinel-gateway")]
#[command(about = "API gateway with token authentication and distributed rate limiting")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, env = "SENTINEL_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SENTINEL_PORT")]
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long, env = "SENTINEL_CONFIG")]
    config: Option<PathBuf>,

    /// Redis URL for distributed rate limiting
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Base64 secret (>= 256 bits) for signing session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Base64 AES key (128, 192 or 256 bits) for stored credentials
    #[arg(long, env = "CIPHER_KEY", hide_env_values = true)]
    cipher_key: Option<String>,

    /// Session token lifetime in seconds
    #[arg(long, env = "TOKEN_TTL_SECS")]
    token_ttl_secs: Option<u64>,

    /// Disable rate limiting
    #[arg(long, env = "SENTINEL_NO_RATE_LIMIT")]
    no_rate_limit: bool,

    /// Generate throwaway keys when secrets are missing (for development only!)
    #[arg(long, env = "SENTINEL_ALLOW_EPHEMERAL_KEYS")]
    allow_ephemeral_keys: bool,

    /// Enable debug logging
    #[arg(short, long, env = "SENTINEL_DEBUG")]
    debug: bool,

    /// Print a fresh signing secret and cipher key, then exit
    #[arg(long)]
    generate_secret: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if args.generate_secret {
        println!("JWT_SECRET={}", generate_base64_secret(256));
        println!("CIPHER_KEY={}", generate_base64_key(256)?);
        return Ok(());
    }

    // Setup logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "sentinel_cli={level},sentinel_core={level},sentinel_store={level},sentinel_crypto={level},tower_http=debug",
                level = log_level
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = GatewayConfig::load(args.config.as_deref())?;
    config.apply(ConfigOverrides {
        host: args.host,
        port: args.port,
        redis_url: args.redis_url,
        jwt_secret: args.jwt_secret,
        cipher_key: args.cipher_key,
        token_ttl_secs: args.token_ttl_secs,
        disable_rate_limit: args.no_rate_limit,
        allow_ephemeral_keys: args.allow_ephemeral_keys,
    });

    tracing::info!("Starting SentinelGate on {}", config.bind_addr());
    tracing::debug!(?config, "Effective configuration");

    if config.allow_ephemeral_keys {
        tracing::warn!("⚠️  Ephemeral keys are ALLOWED - for development only!");
    }

    run_server(config).await
}
