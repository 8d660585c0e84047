//! Session endpoints: login, signup and token validation

use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use sentinel_core::SessionError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Login/signup request body
#[derive(Debug, Default, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Login/signup response body
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub message: String,
}

impl AuthResponse {
    fn message(status: StatusCode, message: impl Into<String>) -> Response {
        let body = Self {
            token: None,
            message: message.into(),
        };
        (status, Json(body)).into_response()
    }
}

/// Query parameters for token validation
#[derive(Debug, Deserialize)]
pub struct ValidateParams {
    pub token: Option<String>,
}

/// POST /auth/login
pub async fn login(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match parse_request(&body) {
        Ok(req) => {
            let result = state
                .sessions
                .login(req.username.as_deref().unwrap_or_default(), req.password.as_deref().unwrap_or_default())
                .await;
            session_response(result)
        }
        Err(response) => response,
    }
}

/// POST /auth/signup
pub async fn signup(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match parse_request(&body) {
        Ok(req) => {
            let result = state
                .sessions
                .signup(req.username.as_deref().unwrap_or_default(), req.password.as_deref().unwrap_or_default())
                .await;
            session_response(result)
        }
        Err(response) => response,
    }
}

/// POST /auth/validate?token=...
pub async fn validate(State(state): State<Arc<AppState>>, Query(params): Query<ValidateParams>) -> Json<bool> {
    let valid = params
        .token
        .as_deref()
        .is_some_and(|token| state.sessions.validate(token));
    Json(valid)
}

fn parse_request(body: &[u8]) -> Result<AuthRequest, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AuthRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Malformed auth request body");
        AuthResponse::message(StatusCode::BAD_REQUEST, "Malformed request body.")
    })
}

fn session_response(result: Result<String, SessionError>) -> Response {
    match result {
        Ok(token) => Json(AuthResponse {
            token: Some(token),
            message: "Success".to_string(),
        })
        .into_response(),
        Err(SessionError::Invalid(message)) => AuthResponse::message(StatusCode::BAD_REQUEST, message),
        Err(SessionError::Unauthorized(message)) => AuthResponse::message(StatusCode::UNAUTHORIZED, message),
        Err(SessionError::Internal(e)) => {
            tracing::error!(error = %e, "Session operation failed");
            AuthResponse::message(StatusCode::INTERNAL_SERVER_ERROR, "Failed!")
        }
    }
}
