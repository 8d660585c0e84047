//! HTTP route definitions

use crate::{handlers, middleware, AppState};
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware as axum_middleware,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main router
///
/// `/health` sits outside the gate. Everything else goes through
/// authentication (unless bypassed) and admission control first.
pub fn create_router(state: Arc<AppState>) -> Router {
    let gated = Router::new()
        // Session endpoints
        .route("/auth/login", post(handlers::login))
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/validate", post(handlers::validate))
        // Forwarded services
        .route("/{service}", any(handlers::proxy))
        .route("/{service}/{*rest}", any(handlers::proxy))
        .route_layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::gate_middleware,
        ));

    // Spans carry the path only; query strings may hold tokens
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::debug_span!("request", method = %request.method(), path = %request.uri().path())
    });

    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .merge(gated)
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware));

    if state.config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any);
        router = router.layer(cors);
    }

    router
        .layer(trace)
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GatewayConfig;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use sentinel_core::{AdmissionController, RateLimitConfig, ServiceRegistry};
    use sentinel_crypto::{CipherKey, CredentialCipher, SigningKey, TokenSigner};
    use sentinel_store::MemoryUserStore;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(max_tokens: u32) -> Router {
        let signer = Arc::new(TokenSigner::new(SigningKey::generate(), Duration::from_secs(60)).unwrap());
        let cipher = Arc::new(CredentialCipher::new(&CipherKey::generate()).unwrap());
        let admission = Arc::new(AdmissionController::local_only(RateLimitConfig {
            max_tokens,
            window_ttl_ms: 60_000,
            ..Default::default()
        }));
        let state = AppState::from_parts(
            GatewayConfig::default(),
            signer,
            cipher,
            Arc::new(MemoryUserStore::new()),
            admission,
            Arc::new(ServiceRegistry::new()),
        )
        .unwrap();
        create_router(Arc::new(state))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let response = app(1).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Welcome");
    }

    #[tokio::test]
    async fn test_service_routes_are_gated() {
        let response = app(10).oneshot(get("/product/1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_routes_bypass_authentication() {
        let request = Request::builder()
            .method("POST")
            .uri("/auth/validate?token=abc")
            .body(Body::empty())
            .unwrap();
        let response = app(10).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"false");
    }

    #[tokio::test]
    async fn test_inbound_request_id_is_echoed() {
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "trace-1")
            .body(Body::empty())
            .unwrap();
        let response = app(1).oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "trace-1");
    }
}
