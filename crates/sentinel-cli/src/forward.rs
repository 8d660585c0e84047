//! Upstream request forwarding
//!
//! Resolves the service, rebuilds the request against the upstream base
//! address and translates the upstream answer back into a gateway response.
//! Only transport failures become `502`; upstream error statuses are passed
//! through with their body.

use crate::ApiError;
use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use sentinel_core::{Route, ServiceResolver};
use std::sync::Arc;
use std::time::Duration;

/// Headers that describe one hop and are never copied upstream
const HOP_BY_HOP: [HeaderName; 7] = [
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::TE,
    header::TRAILER,
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name) || matches!(name.as_str(), "keep-alive" | "proxy-connection")
}

/// Headers the gateway negotiates itself instead of copying from the caller.
///
/// The upstream body is decoded before it is interpreted, so the encodings
/// offered upstream must be ones the client can decode.
fn is_negotiated(name: &HeaderName) -> bool {
    *name == header::ACCEPT_ENCODING
}

/// The parts of an inbound request the forwarder needs
#[derive(Clone, Debug)]
pub struct InboundRequest {
    pub method: Method,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A fully resolved upstream call
#[derive(Clone, Debug)]
pub struct OutboundRequestSpec {
    pub method: Method,
    pub target_url: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    pub timeout: Duration,
}

/// Body of an upstream answer after interpretation
#[derive(Clone, Debug, PartialEq)]
pub enum UpstreamBody {
    Empty,
    Json(serde_json::Value),
    Text(String),
}

impl UpstreamBody {
    /// Interpret raw upstream text.
    ///
    /// Only text whose outer characters look like a JSON object or array is
    /// parsed; anything else, or anything that fails to parse, stays text.
    pub fn interpret(text: String) -> Self {
        if text.is_empty() {
            return Self::Empty;
        }

        let trimmed = text.trim();
        let json_shaped = (trimmed.starts_with('{') && trimmed.ends_with('}'))
            || (trimmed.starts_with('[') && trimmed.ends_with(']'));
        if json_shaped {
            match serde_json::from_str(trimmed) {
                Ok(value) => return Self::Json(value),
                Err(e) => {
                    tracing::info!(error = %e, "Upstream body looked like JSON but did not parse; returning text");
                }
            }
        }
        Self::Text(text)
    }
}

/// Upstream answer translated for the caller
#[derive(Clone, Debug)]
pub struct ForwardedResponse {
    pub status: StatusCode,
    pub body: UpstreamBody,
}

impl IntoResponse for ForwardedResponse {
    fn into_response(self) -> Response {
        match self.body {
            UpstreamBody::Empty if self.status.is_success() => StatusCode::NO_CONTENT.into_response(),
            UpstreamBody::Empty => self.status.into_response(),
            UpstreamBody::Json(value) => (self.status, Json(value)).into_response(),
            UpstreamBody::Text(text) => (
                self.status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                text,
            )
                .into_response(),
        }
    }
}

/// Forwards gated requests to configured upstream services
pub struct ProxyForwarder {
    client: reqwest::Client,
    resolver: Arc<dyn ServiceResolver>,
}

impl ProxyForwarder {
    /// Create a forwarder with a pooled HTTP client
    pub fn new(resolver: Arc<dyn ServiceResolver>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { client, resolver })
    }

    /// Forward `inbound` to `service_key`, appending `path_suffix`
    pub async fn forward(
        &self,
        service_key: &str,
        path_suffix: &str,
        inbound: InboundRequest,
    ) -> Result<ForwardedResponse, ApiError> {
        let Some(route) = self.resolver.resolve(service_key) else {
            tracing::error!(service = service_key, "No upstream configured");
            return Err(ApiError::ServiceNotConfigured(service_key.to_string()));
        };

        let spec = build_outbound(&route, path_suffix, inbound)?;
        tracing::info!(service = service_key, method = %spec.method, target = %spec.target_url, "Forwarding request");
        self.send(spec).await
    }

    async fn send(&self, spec: OutboundRequestSpec) -> Result<ForwardedResponse, ApiError> {
        let method = spec.method.clone();
        let target = spec.target_url.clone();
        let upstream_failure = |e: reqwest::Error| {
            tracing::error!(method = %method, target = %target, error = %e, "Upstream call failed");
            ApiError::Upstream(e.to_string())
        };

        let mut request = self
            .client
            .request(spec.method, &spec.target_url)
            .headers(spec.headers)
            .timeout(spec.timeout);
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(&upstream_failure)?;
        let status = response.status();
        let text = response.text().await.map_err(&upstream_failure)?;

        tracing::debug!(status = status.as_u16(), bytes = text.len(), "Upstream responded");
        Ok(ForwardedResponse {
            status,
            body: UpstreamBody::interpret(text),
        })
    }
}

impl std::fmt::Debug for ProxyForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyForwarder").finish_non_exhaustive()
    }
}

/// Build the upstream call for an already resolved route.
///
/// The target is `base + "/" + service_key + suffix [+ "?" + query]`.
/// Methods other than GET, POST, PUT and DELETE are refused, and a
/// non-empty body on POST or PUT must be valid JSON.
pub fn build_outbound(
    route: &Route,
    path_suffix: &str,
    inbound: InboundRequest,
) -> Result<OutboundRequestSpec, ApiError> {
    let method = inbound.method;
    if ![Method::GET, Method::POST, Method::PUT, Method::DELETE].contains(&method) {
        return Err(ApiError::MethodNotAllowed(method.to_string()));
    }

    let mut target_url = format!("{}/{}{}", route.base_address, route.service_key, path_suffix);
    if let Some(query) = inbound.query.as_deref().filter(|q| !q.is_empty()) {
        target_url.push('?');
        target_url.push_str(query);
    }

    let mut headers = HeaderMap::with_capacity(inbound.headers.len());
    for (name, value) in &inbound.headers {
        if !is_hop_by_hop(name) && !is_negotiated(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    let body = if method == Method::GET || method == Method::DELETE || inbound.body.is_empty() {
        None
    } else {
        let value = serde_json::from_slice(&inbound.body)
            .map_err(|e| ApiError::BadRequest(format!("Request body is not valid JSON: {}", e)))?;
        Some(value)
    };

    if body.is_some() && !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    Ok(OutboundRequestSpec {
        method,
        target_url,
        headers,
        body,
        timeout: route.timeout,
    })
}
