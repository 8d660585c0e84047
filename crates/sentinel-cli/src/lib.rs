//! # SentinelGate Gateway
//!
//! HTTP front door for a set of backend services.
//!
//! This crate provides:
//! - **Request gate**: Path-based auth bypass, session token validation, rate limiting
//! - **Forwarding**: Transparent proxying to statically configured upstreams
//! - **Sessions**: Login, signup and token validation endpoints
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   HTTP Clients                      │
//! └─────────────────────────┬───────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────┐
//! │                    SentinelGate                     │
//! ├─────────────────────────────────────────────────────┤
//! │   Request Gate (auth bypass │ token │ admission)    │
//! ├──────────────────────────┬──────────────────────────┤
//! │     Session handlers     │     Proxy forwarder      │
//! ├──────────────────────────┴──────────────────────────┤
//! │          sentinel-core / sentinel-crypto            │
//! ├─────────────────────────────────────────────────────┤
//! │                   sentinel-store                    │
//! │               (Redis, in-memory)                    │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod forward;
pub mod gate;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use crate::config::{ConfigOverrides, GatewayConfig, ServiceConfig};
pub use error::ApiError;
pub use forward::ProxyForwarder;
pub use gate::{GateOutcome, RequestGate};
pub use server::{run_server, run_server_with_shutdown};
pub use state::AppState;
