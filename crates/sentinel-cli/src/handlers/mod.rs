//! HTTP request handlers

pub mod auth;
pub mod health;
pub mod proxy;

pub use auth::*;
pub use health::*;
pub use proxy::*;
