//! OpenRelay - a stateless CORS and forward proxy gateway
//!
//! Fetches public URLs on behalf of browsers and other callers, adds
//! permissive CORS headers and rewrites redirects and HTML links so that
//! navigation stays on the gateway.
//!
//! # Overview
//!
//! This crate is the binary side of OpenRelay:
//! - Command line parsing with `clap`
//! - Configuration loading from environment variables
//! - Connection limiting and the `hyper` server loop with graceful shutdown
//!
//! The request pipeline itself lives in `openrelay-core`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use openrelay::{config, connection::ConnectionLimiter, server};
//! use openrelay_core::{HttpTransport, ProxyState};
//!
//! # async fn start() -> std::io::Result<()> {
//! let config = config::get_config();
//! let transport = HttpTransport::new(&config.proxy, &config.cache).unwrap();
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! let state = ProxyState::new(Arc::new(config.clone()), Arc::new(transport), "127.0.0.1:8080");
//! server::run(listener, state, ConnectionLimiter::new(0), std::future::pending()).await
//! # }
//! ```
//!
//! # Modules
//!
//! - [`args`] - Command line argument parsing
//! - [`config`] - Configuration management from environment variables
//! - [`connection`] - Concurrent connection limiting
//! - [`env_vars`] - Environment variable constants
//! - [`server`] - Server loop and startup info

#![forbid(unsafe_code)]

pub mod args;
pub mod config;
pub mod connection;
pub mod env_vars;
pub mod server;

// Re-export openrelay-core modules
pub use openrelay_core::request_handler;
pub use openrelay_core::types;

// Re-export commonly used items at crate root
pub use config::{get_config, get_max_connections};
pub use openrelay_core::{ConfigProvider, GatewayConfig, HttpTransport, ProxyError, ProxyState};
