//! # Sentinel Core
//!
//! Pipeline components of the SentinelGate API gateway.
//!
//! This crate provides:
//! - **Admission control**: Distributed token bucket with a local sliding-window fallback
//! - **Service registry**: Static service key to upstream address resolution
//! - **Sessions**: Login and signup on top of the token signer and credential cipher
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        RequestGate / Forwarder          │
//! ├─────────────┬─────────────┬─────────────┤
//! │  Admission  │  Registry   │  Sessions   │
//! ├─────────────┴─────────────┼─────────────┤
//! │      sentinel-store       │   crypto    │
//! └───────────────────────────┴─────────────┘
//! ```

pub mod admission;
pub mod error;
pub mod registry;
pub mod session;

pub use admission::{take_token, AdmissionController, RateLimitConfig};
pub use error::{CoreError, Result};
pub use registry::{Route, ServiceRegistry, ServiceResolver};
pub use session::{AuthSessionService, SessionError, UserIdentity};
