//! Shared-secret authentication.
//!
//! When a secret is configured, every request (except health checks) must
//! carry it in the configured header, `x-api-key` by default. Without a
//! secret the gateway is open.

use hyper::HeaderMap;

use crate::error::{ProxyError, Result};
use crate::types::AuthenticationProvider;

/// Checks the shared-secret header of a request.
///
/// # Errors
///
/// Returns [`ProxyError::Unauthorized`] with `"Missing <header> header"` when
/// the header is absent, or `"Invalid API Key"` when it does not match.
///
/// # Example
///
/// ```
/// use hyper::HeaderMap;
/// use openrelay_core::{GatewayConfig, auth::check_api_key};
///
/// let config = GatewayConfig::default().with_secret("s3cret");
/// let mut headers = HeaderMap::new();
/// assert!(check_api_key(&headers, &config).is_err());
///
/// headers.insert("x-api-key", "s3cret".parse().unwrap());
/// assert!(check_api_key(&headers, &config).is_ok());
/// ```
pub fn check_api_key(headers: &HeaderMap, config: &impl AuthenticationProvider) -> Result<()> {
    let Some(secret) = config.shared_secret().filter(|s| !s.is_empty()) else {
        return Ok(());
    };

    let header = config.api_key_header();
    let Some(provided) = headers.get(header) else {
        return Err(ProxyError::Unauthorized(format!("Missing {header} header")));
    };

    if constant_time_eq(provided.as_bytes(), secret.as_bytes()) {
        Ok(())
    } else {
        Err(ProxyError::Unauthorized("Invalid API Key".to_string()))
    }
}

/// Constant-time byte comparison to prevent timing attacks.
/// Does not leak length information through timing.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len_eq = a.len() == b.len();
    let max_len = a.len().max(b.len());
    let mut result = 0u8;

    for i in 0..max_len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        result |= x ^ y;
    }

    len_eq && result == 0
}
