//! Static service registry
//!
//! Maps a logical service key (the first path segment of a forwarded
//! request) to the upstream that serves it. Routes are loaded once at
//! startup and never change.

use crate::{CoreError, Result};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Default upstream timeout when a route does not set one
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// A configured upstream service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// Logical key, e.g. `product`
    pub service_key: String,
    /// Base address without a trailing slash, e.g. `http://localhost:8081`
    pub base_address: String,
    /// Upper bound on one upstream call
    pub timeout: Duration,
}

/// Resolves service keys to routes
pub trait ServiceResolver: Send + Sync {
    /// Look up the route for `service_key`
    fn resolve(&self, service_key: &str) -> Option<Route>;
}

/// Registry backed by static configuration
#[derive(Clone, Debug, Default)]
pub struct ServiceRegistry {
    routes: HashMap<String, Route>,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route, validating the key and base address
    pub fn insert(&mut self, service_key: &str, base_address: &str, timeout: Duration) -> Result<()> {
        let route = Self::build_route(service_key, base_address, timeout)?;
        self.routes.insert(route.service_key.clone(), route);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_route(mut self, service_key: &str, base_address: &str, timeout: Duration) -> Result<Self> {
        self.insert(service_key, base_address, timeout)?;
        Ok(self)
    }

    /// Number of configured services
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if no services are configured
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Configured service keys, sorted
    pub fn service_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    fn build_route(service_key: &str, base_address: &str, timeout: Duration) -> Result<Route> {
        let invalid = |reason: &str| CoreError::InvalidRoute {
            service: service_key.to_string(),
            reason: reason.to_string(),
        };

        if service_key.is_empty() || service_key.contains('/') {
            return Err(invalid("service key must be a single non-empty path segment"));
        }
        if timeout.is_zero() {
            return Err(invalid("timeout must be non-zero"));
        }

        let url = Url::parse(base_address).map_err(|e| invalid(&format!("base address: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("base address must use http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("base address has no host"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("base address must not carry a query or fragment"));
        }

        Ok(Route {
            service_key: service_key.to_string(),
            base_address: base_address.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

impl ServiceResolver for ServiceRegistry {
    fn resolve(&self, service_key: &str) -> Option<Route> {
        self.routes.get(service_key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_resolve_configured_service() {
        let registry = ServiceRegistry::new()
            .with_route("product", "http://localhost:8081/", Duration::from_secs(5))
            .unwrap();

        let route = registry.resolve("product").unwrap();
        assert_eq!(route.base_address, "http://localhost:8081");
        assert_eq!(route.timeout, Duration::from_secs(5));
        assert!(registry.resolve("orders").is_none());
    }

    #[test]
    fn test_service_keys_sorted() {
        let registry = ServiceRegistry::new()
            .with_route("orders", "http://orders:80", DEFAULT_UPSTREAM_TIMEOUT)
            .unwrap()
            .with_route("billing", "https://billing.internal", DEFAULT_UPSTREAM_TIMEOUT)
            .unwrap();
        assert_eq!(registry.service_keys(), vec!["billing", "orders"]);
        assert_eq!(registry.len(), 2);
    }

    #[rstest]
    #[case("", "http://localhost:8081")]
    #[case("a/b", "http://localhost:8081")]
    #[case("product", "localhost:8081")]
    #[case("product", "ftp://files.example.com")]
    #[case("product", "not a url")]
    #[case("product", "http://localhost:8081?x=1")]
    fn test_invalid_routes_rejected(#[case] key: &str, #[case] base: &str) {
        let result = ServiceRegistry::new().with_route(key, base, DEFAULT_UPSTREAM_TIMEOUT);
        assert!(matches!(result, Err(CoreError::InvalidRoute { .. })));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = ServiceRegistry::new().with_route("product", "http://localhost:8081", Duration::ZERO);
        assert!(result.is_err());
    }
}
