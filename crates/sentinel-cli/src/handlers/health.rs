//! Liveness endpoint

/// GET /health
pub async fn health_check() -> &'static str {
    "Welcome"
}
