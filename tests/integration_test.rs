//! Integration tests for SentinelGate components
//!
//! These tests wire the session service, admission controller and stores
//! together without going through HTTP.

use sentinel_gate::core::{
    take_token, AdmissionController, AuthSessionService, RateLimitConfig, ServiceRegistry,
    ServiceResolver, SessionError, UserIdentity,
};
use sentinel_gate::crypto::{CipherKey, CredentialCipher, SigningKey, TokenSigner};
use sentinel_gate::store::{
    BucketState, MemoryRateLimitStore, MemoryUserStore, RateLimitStore, UserStore,
};
use std::sync::Arc;
use std::time::Duration;

fn session_service() -> (AuthSessionService, Arc<MemoryUserStore>, Arc<CredentialCipher>) {
    let users = Arc::new(MemoryUserStore::new());
    let cipher = Arc::new(CredentialCipher::new(&CipherKey::generate()).unwrap());
    let signer = Arc::new(TokenSigner::new(SigningKey::generate(), Duration::from_secs(60)).unwrap());
    let service = AuthSessionService::new(users.clone(), Arc::clone(&cipher), signer);
    (service, users, cipher)
}

/// Signup stores an encrypted password and issues a usable token
#[tokio::test]
async fn test_signup_persists_encrypted_credentials() {
    let (service, users, cipher) = session_service();

    let token = service.signup("carol", "s3cret").await.unwrap();
    let identity = service.identify(&token).unwrap();
    assert_eq!(identity.username, "carol");

    let record = users.find_by_username("carol").await.unwrap().unwrap();
    assert_ne!(record.encrypted_password, "s3cret");
    assert_eq!(cipher.decrypt(&record.encrypted_password).unwrap(), "s3cret");
    assert_eq!(UserIdentity::from(&record), identity);
}

/// Two signups never create two records for one username
#[tokio::test]
async fn test_concurrent_signups_single_record() {
    let (service, users, _) = session_service();
    let service = Arc::new(service);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.signup("dave", "pw").await })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    let record = users.find_by_username("dave").await.unwrap().unwrap();
    assert_eq!(record.id, 1);
}

#[tokio::test]
async fn test_login_errors_are_indistinguishable() {
    let (service, _, _) = session_service();
    service.signup("erin", "pw").await.unwrap();

    let unknown = service.login("nobody", "pw").await.unwrap_err();
    let wrong = service.login("erin", "nope").await.unwrap_err();
    match (unknown, wrong) {
        (SessionError::Unauthorized(a), SessionError::Unauthorized(b)) => assert_eq!(a, b),
        other => panic!("expected two Unauthorized errors, got {:?}", other),
    }
}

/// A token from one gateway instance is worthless to another with a different key
#[tokio::test]
async fn test_tokens_bound_to_signing_key() {
    let (first, _, _) = session_service();
    let (second, _, _) = session_service();

    let token = first.signup("frank", "pw").await.unwrap();
    assert!(first.validate(&token));
    assert!(!second.validate(&token));
}

/// Two controllers sharing one store enforce a single budget
#[tokio::test]
async fn test_shared_store_enforces_one_budget() {
    let store: Arc<dyn RateLimitStore> = Arc::new(MemoryRateLimitStore::new());
    let config = RateLimitConfig {
        max_tokens: 4,
        refill_interval_ms: 60_000,
        ..Default::default()
    };
    let a = AdmissionController::new(config.clone(), Some(Arc::clone(&store)));
    let b = AdmissionController::new(config, Some(Arc::clone(&store)));

    let now = 1_000_000;
    let mut admitted = 0;
    for i in 0..8 {
        let controller = if i % 2 == 0 { &a } else { &b };
        if controller.is_allowed_at("/product/1", now).await {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 4);

    let saved = store.load_bucket("/product/1").await.unwrap().unwrap();
    assert_eq!(saved.available_tokens, 0);
}

/// Refill after a stored bucket was drained
#[tokio::test]
async fn test_bucket_refills_from_stored_state() {
    let store = Arc::new(MemoryRateLimitStore::new());
    let config = RateLimitConfig::default();
    let interval = config.interval_of(9_000_000);

    store
        .save_bucket(
            "/orders",
            &BucketState {
                available_tokens: 0,
                last_refill_interval: interval - 1,
            },
        )
        .await
        .unwrap();

    let controller = AdmissionController::new(config.clone(), Some(store.clone() as Arc<dyn RateLimitStore>));
    assert!(controller.is_allowed_at("/orders", 9_000_000).await);

    let saved = store.load_bucket("/orders").await.unwrap().unwrap();
    let expected = take_token(
        Some(BucketState {
            available_tokens: 0,
            last_refill_interval: interval - 1,
        }),
        interval,
        &config,
    )
    .unwrap();
    assert_eq!(saved, expected);
    assert_eq!(saved.available_tokens, config.tokens_per_interval - 1);
}

#[test]
fn test_registry_resolves_configured_routes() {
    let registry = ServiceRegistry::new()
        .with_route("product", "http://product:8081/", Duration::from_secs(5))
        .unwrap()
        .with_route("order", "https://order.internal", Duration::from_secs(1))
        .unwrap();

    let route = registry.resolve("product").unwrap();
    assert_eq!(route.base_address, "http://product:8081");
    assert_eq!(route.timeout, Duration::from_secs(5));
    assert!(registry.resolve("inventory").is_none());
    assert_eq!(registry.service_keys(), vec!["order", "product"]);
}
