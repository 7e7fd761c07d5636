//! Configuration management for OpenRelay.
//!
//! This module loads the gateway configuration from environment variables.
//! Everything is computed once at first access and cached for the lifetime
//! of the application using `once_cell::sync::Lazy`.
//!
//! Invalid values never stop the gateway: they log a warning and the default
//! is used instead.
//!
//! # Example
//!
//! ```
//! use openrelay::config;
//! use openrelay_core::RateLimitingProvider;
//!
//! let config = config::get_config();
//! println!("Max requests: {}", config.rate_limit_config().max_requests);
//! ```

use std::env::VarError;
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::env_vars;
use openrelay_core::defaults;
use openrelay_core::{CacheConfig, GatewayConfig, ProxyConfig, RateLimitConfig};

// ============================================================================
// Cached Configuration (computed once at first access)
// ============================================================================

static CONFIG: Lazy<GatewayConfig> = Lazy::new(|| load_config_internal(|key| std::env::var(key)));
static MAX_CONNECTIONS: Lazy<usize> =
    Lazy::new(|| compute_max_connections_internal(|key| std::env::var(key)));

// ============================================================================
// Internal Helpers
// ============================================================================

/// Parses an environment variable with fallback to a default value.
///
/// Logs a warning if the value exists but cannot be parsed.
fn parse_env_var_or_default<T, F>(env_var: &F, var_name: &str, default: T) -> T
where
    T: FromStr + Copy,
    F: Fn(&str) -> Result<String, VarError>,
{
    match env_var(var_name) {
        Ok(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var = var_name, value = %value, "Invalid env var value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Parses a boolean flag.
///
/// Accepts `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off` in any case.
fn parse_bool_or_default<F>(env_var: &F, var_name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match env_var(var_name) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => {
                warn!(var = var_name, value = %value, "Invalid boolean value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Parses a comma-separated string into a Vec of trimmed, lower-cased strings.
///
/// Filters out empty entries after trimming.
fn parse_comma_separated_lowercase(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Reads a list variable, falling back to `default` when it is unset.
///
/// A variable that is set but blank yields an empty list, so operators can
/// switch a default list off entirely.
fn list_or_default<F>(env_var: &F, var_name: &str, default: &[&str]) -> Vec<String>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match env_var(var_name) {
        Ok(value) => parse_comma_separated_lowercase(&value),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}

/// Reads an optional string variable, treating blank values as unset.
fn non_empty<F>(env_var: &F, var_name: &str) -> Option<String>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    env_var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Section loaders
// ============================================================================

/// Computes rate limiting configuration.
/// Invalid values fall back to defaults and log warnings.
fn compute_rate_limit_config<F>(env_var: &F) -> RateLimitConfig
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let enabled = parse_bool_or_default(env_var, env_vars::RATE_LIMIT_ENABLED, true);
    let max_requests = parse_env_var_or_default(
        env_var,
        env_vars::RATE_LIMIT_REQUESTS,
        defaults::RATE_LIMIT_REQUESTS,
    );
    let window_secs = parse_env_var_or_default(
        env_var,
        env_vars::RATE_LIMIT_WINDOW_SECS,
        defaults::RATE_LIMIT_WINDOW_SECS,
    );
    let max_tracked_clients = parse_env_var_or_default(
        env_var,
        env_vars::RATE_LIMIT_MAX_CLIENTS,
        defaults::RATE_LIMIT_MAX_CLIENTS,
    );

    let config = RateLimitConfig {
        enabled,
        max_requests,
        window_duration: Duration::from_secs(window_secs),
        max_tracked_clients,
    };

    if !config.is_valid() {
        warn!("Invalid rate limit configuration, using defaults");
        return RateLimitConfig {
            enabled,
            ..RateLimitConfig::default()
        };
    }

    config
}

/// Computes cache configuration.
fn compute_cache_config<F>(env_var: &F) -> CacheConfig
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let mut ttl_secs =
        parse_env_var_or_default(env_var, env_vars::CACHE_TTL_SECS, defaults::CACHE_TTL_SECS);
    if ttl_secs == 0 {
        warn!(var = env_vars::CACHE_TTL_SECS, "Cache TTL must be positive, using default");
        ttl_secs = defaults::CACHE_TTL_SECS;
    }

    CacheConfig {
        enabled: parse_bool_or_default(env_var, env_vars::CACHE_ENABLED, true),
        ttl: Duration::from_secs(ttl_secs),
        cache_everything: parse_bool_or_default(env_var, env_vars::CACHE_EVERYTHING, true),
        max_entries: parse_env_var_or_default(
            env_var,
            env_vars::CACHE_MAX_ENTRIES,
            defaults::CACHE_MAX_ENTRIES,
        ),
    }
}

/// Computes proxy configuration.
fn compute_proxy_config<F>(env_var: &F) -> ProxyConfig
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let timeout_secs = parse_env_var_or_default(
        env_var,
        env_vars::PROXY_TIMEOUT_SECS,
        defaults::PROXY_TIMEOUT_SECS,
    );
    let max_body_mb = parse_env_var_or_default(
        env_var,
        env_vars::MAX_BODY_SIZE_MB,
        defaults::MAX_BODY_SIZE_MB,
    );
    let public_origin = compute_public_origin(env_var);

    let config = ProxyConfig {
        timeout: Duration::from_secs(timeout_secs),
        max_body_size: ProxyConfig::mb_to_bytes(max_body_mb),
        public_origin: public_origin.clone(),
    };

    if !config.is_valid() {
        warn!("Invalid proxy configuration, using defaults");
        return ProxyConfig {
            public_origin,
            ..ProxyConfig::default()
        };
    }

    config
}

/// Validates `PUBLIC_ORIGIN`: an absolute http(s) URL, kept without its
/// trailing slash.
fn compute_public_origin<F>(env_var: &F) -> Option<String>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let raw = non_empty(env_var, env_vars::PUBLIC_ORIGIN)?;

    match url::Url::parse(&raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            Some(raw.trim_end_matches('/').to_string())
        }
        _ => {
            warn!(var = env_vars::PUBLIC_ORIGIN, value = %raw, "Invalid public origin, ignoring");
            None
        }
    }
}

/// Computes trusted proxy IPs. `None` means client IP headers are never trusted.
fn compute_trusted_proxy_ips<F>(env_var: &F) -> Option<Vec<String>>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let raw = non_empty(env_var, env_vars::TRUSTED_PROXY_IPS)?;
    let ips = parse_comma_separated_lowercase(&raw);
    (!ips.is_empty()).then_some(ips)
}

/// Builds the whole gateway configuration from an environment lookup.
///
/// Split from [`get_config`] so tests can inject a mock environment.
fn load_config_internal<F>(env_var: F) -> GatewayConfig
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let api_key_header = non_empty(&env_var, env_vars::API_KEY_HEADER)
        .map(|h| h.to_lowercase())
        .filter(|h| {
            let valid = hyper::header::HeaderName::from_bytes(h.as_bytes()).is_ok();
            if !valid {
                warn!(var = env_vars::API_KEY_HEADER, value = %h, "Invalid header name, using default");
            }
            valid
        })
        .unwrap_or_else(|| defaults::API_KEY_HEADER.to_string());

    GatewayConfig {
        version: env!("CARGO_PKG_VERSION").to_string(),
        rate_limit: compute_rate_limit_config(&env_var),
        cache: compute_cache_config(&env_var),
        proxy: compute_proxy_config(&env_var),
        blocked_hosts: list_or_default(&env_var, env_vars::BLOCKED_HOSTS, defaults::BLOCKED_HOSTS),
        removed_headers: list_or_default(
            &env_var,
            env_vars::REMOVE_HEADERS,
            defaults::REMOVE_HEADERS,
        ),
        trusted_proxy_ips: compute_trusted_proxy_ips(&env_var),
        api_key_header,
        secret: env_var(env_vars::SECRET).ok().filter(|s| !s.is_empty()),
    }
}

/// Computes maximum connections.
fn compute_max_connections_internal<F>(env_var: F) -> usize
where
    F: Fn(&str) -> Result<String, VarError>,
{
    parse_env_var_or_default(&env_var, env_vars::MAX_CONNECTIONS, defaults::MAX_CONNECTIONS)
}

// ============================================================================
// Public Configuration Getters
// ============================================================================

/// Returns the cached gateway configuration.
///
/// See [`crate::env_vars`] for the variables read on first access.
pub fn get_config() -> &'static GatewayConfig {
    &CONFIG
}

/// Returns the cached maximum number of concurrent connections.
///
/// # Returns
///
/// - `0`: Unlimited connections (not recommended for production)
/// - `> 0`: Maximum number of concurrent connections
///
/// **Default**: `10000`
pub fn get_max_connections() -> usize {
    *MAX_CONNECTIONS
}
