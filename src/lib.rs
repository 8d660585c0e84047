//! # SentinelGate
//!
//! API gateway workspace. Re-exports the member crates so end-to-end tests
//! and embedders can depend on a single package.

pub use sentinel_cli as gateway;
pub use sentinel_core as core;
pub use sentinel_crypto as crypto;
pub use sentinel_store as store;
