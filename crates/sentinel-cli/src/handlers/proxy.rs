//! Catch-all forwarding handler

use crate::forward::InboundRequest;
use crate::{ApiError, AppState};
use axum::{
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::sync::Arc;

/// `{METHOD} /{service}` and `{METHOD} /{service}/**`
pub async fn proxy(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let (service_key, path_suffix) = split_service_path(uri.path());
    let inbound = InboundRequest {
        method,
        query: uri.query().map(str::to_owned),
        headers,
        body,
    };

    let response = state.forwarder.forward(service_key, path_suffix, inbound).await?;
    Ok(response.into_response())
}

/// Split `/product/123/reviews` into `("product", "/123/reviews")`.
///
/// The suffix keeps its leading slash and raw encoding.
pub fn split_service_path(path: &str) -> (&str, &str) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    match trimmed.find('/') {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    }
}
