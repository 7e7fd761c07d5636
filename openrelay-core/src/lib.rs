//! OpenRelay Core - request pipeline of a stateless CORS/forward proxy gateway
//!
//! This crate provides everything between "a request arrived" and "a
//! response goes out":
//! - Shared-secret authentication and per-client fixed-window rate limiting
//! - Target URL extraction (query parameter, path, forward-proxy addressing)
//! - A host/scheme safety filter against blocked destinations
//! - Header sanitizing before dispatch
//! - Redirect `Location` and HTML link rewriting so browsers stay on the gateway
//! - An outbound [`Transport`] with an in-memory response cache
//!
//! # Overview
//!
//! Configuration is injected through the composable provider traits
//! aggregated by [`ConfigProvider`]; [`GatewayConfig`] implements all of
//! them. The network is reached only through the [`Transport`] trait, so the
//! whole pipeline runs in tests without sockets.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use openrelay_core::{GatewayConfig, HttpTransport, request_handler::ProxyState};
//!
//! let config = GatewayConfig::default().with_secret("s3cret");
//! let transport = HttpTransport::new(&config.proxy, &config.cache).unwrap();
//! let state = ProxyState::new(Arc::new(config), Arc::new(transport), "127.0.0.1:8080");
//! ```
//!
//! # Modules
//!
//! - [`types`] - Configuration traits and structs, rate limiter state
//! - [`error`] - Error type and HTTP mapping
//! - [`request_handler`] - The request pipeline
//! - [`target`], [`url_safety`], [`sanitize`] - Inbound request processing
//! - [`rewrite`] - Redirect and HTML rewriting
//! - [`transport`], [`cache`] - Outbound dispatch and response cache

#![forbid(unsafe_code)]

pub mod auth;
pub mod cache;
pub mod client_ip;
pub mod defaults;
pub mod error;
pub mod headers;
pub mod landing;
pub mod rate_limiter;
pub mod request_handler;
pub mod response;
pub mod rewrite;
pub mod sanitize;
pub mod target;
#[cfg(test)]
pub mod test_utils;
pub mod transport;
pub mod types;
pub mod url_safety;

// Re-export commonly used items at crate root
pub use error::{ProxyError, Result};
pub use request_handler::{ProxyState, handle_request};
pub use transport::{HttpTransport, Transport};
pub use types::{
    // Composable configuration traits
    AuthenticationProvider,
    CacheConfig,
    CachingProvider,
    // Aggregated configuration trait
    ConfigProvider,
    // Concrete configuration
    GatewayConfig,
    // Configuration structs
    ProxyConfig,
    ProxyProvider,
    RateLimitConfig,
    // Rate limiting types
    RateLimitEntry,
    RateLimiter,
    RateLimitingProvider,
    SecurityProvider,
};
