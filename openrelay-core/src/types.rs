//! Type definitions for OpenRelay configuration and shared state.
//!
//! This module contains:
//! - Composable configuration traits and their aggregate [`ConfigProvider`]
//! - Configuration structs for rate limiting, caching and proxying
//! - [`GatewayConfig`], the concrete configuration used by the binary and tests
//! - Rate limiter state shared across connections

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::defaults;

// ============================================================================
// Composable Configuration Traits
// ============================================================================

/// Configuration for rate limiting behavior.
pub trait RateLimitingProvider: Send + Sync {
    /// Returns the rate limiting configuration.
    fn rate_limit_config(&self) -> &RateLimitConfig;
}

/// Configuration for the upstream response cache.
pub trait CachingProvider: Send + Sync {
    /// Returns the cache configuration.
    fn cache_config(&self) -> &CacheConfig;
}

/// Configuration for target and header filtering.
pub trait SecurityProvider: Send + Sync {
    /// Host names or literal prefixes that may not be proxied to.
    fn blocked_hosts(&self) -> &[String];

    /// Request headers removed before dispatching upstream.
    fn removed_headers(&self) -> &[String];

    /// Peers whose client-IP headers are trusted, if configured.
    fn trusted_proxy_ips(&self) -> Option<&[String]>;
}

/// Configuration for proxy behavior.
pub trait ProxyProvider: Send + Sync {
    /// Returns the proxy configuration.
    fn proxy_config(&self) -> &ProxyConfig;

    /// Version string reported by health checks, errors and the landing page.
    fn version(&self) -> &str;
}

/// Configuration for shared-secret authentication.
pub trait AuthenticationProvider: Send + Sync {
    /// Name of the header carrying the shared secret.
    fn api_key_header(&self) -> &str;

    /// The shared secret, if configured.
    fn shared_secret(&self) -> Option<&str>;

    /// Returns true if requests must carry the shared secret.
    fn is_auth_enabled(&self) -> bool {
        self.shared_secret().is_some_and(|s| !s.is_empty())
    }
}

// ============================================================================
// ConfigProvider - Aggregated trait for full configuration
// ============================================================================

/// Trait for complete configuration injection.
///
/// Combines all specialized configuration traits. Any type implementing
/// every sub-trait is a `ConfigProvider` through the blanket implementation.
pub trait ConfigProvider:
    RateLimitingProvider + CachingProvider + SecurityProvider + ProxyProvider + AuthenticationProvider
{
}

impl<T> ConfigProvider for T where
    T: RateLimitingProvider
        + CachingProvider
        + SecurityProvider
        + ProxyProvider
        + AuthenticationProvider
{
}

/// Configuration for rate limiting per client IP.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use openrelay_core::RateLimitConfig;
///
/// let config = RateLimitConfig {
///     enabled: true,
///     max_requests: 100,
///     window_duration: Duration::from_secs(60),
///     max_tracked_clients: 10_000,
/// };
///
/// assert!(config.is_valid());
/// ```
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Whether requests are rate limited at all
    pub enabled: bool,
    /// Maximum number of requests allowed per client within the window
    pub max_requests: u32,
    /// Length of one counting window
    pub window_duration: Duration,
    /// Table size above which every tracked client is forgotten
    pub max_tracked_clients: usize,
}

impl RateLimitConfig {
    /// Returns `true` if the configuration is valid.
    ///
    /// A valid configuration has at least one allowed request and a non-zero window.
    pub fn is_valid(&self) -> bool {
        self.max_requests > 0 && !self.window_duration.is_zero()
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: defaults::RATE_LIMIT_REQUESTS,
            window_duration: defaults::RATE_LIMIT_WINDOW,
            max_tracked_clients: defaults::RATE_LIMIT_MAX_CLIENTS,
        }
    }
}

/// Configuration for caching GET responses.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Whether GET dispatches carry a cache hint
    pub enabled: bool,
    /// How long a stored response stays fresh
    pub ttl: Duration,
    /// Store responses regardless of content type and upstream cache headers
    pub cache_everything: bool,
    /// Entry count above which the cache is pruned
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: defaults::CACHE_TTL,
            cache_everything: true,
            max_entries: defaults::CACHE_MAX_ENTRIES,
        }
    }
}

/// Configuration for proxy behavior and upstream communication.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use openrelay_core::ProxyConfig;
///
/// let config = ProxyConfig {
///     timeout: Duration::from_secs(30),
///     max_body_size: ProxyConfig::mb_to_bytes(100),
///     public_origin: None,
/// };
///
/// assert!(config.is_valid());
/// assert_eq!(config.max_body_size_mb(), "100");
/// ```
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Timeout for upstream requests
    pub timeout: Duration,
    /// Maximum request body size in bytes (0 = unlimited)
    pub max_body_size: usize,
    /// Externally visible origin of the gateway, e.g. `https://p.io`
    pub public_origin: Option<String>,
}

impl ProxyConfig {
    /// Returns `true` if the configuration is valid.
    pub fn is_valid(&self) -> bool {
        !self.timeout.is_zero()
    }

    /// Returns the maximum body size formatted for display.
    pub fn max_body_size_mb(&self) -> String {
        if self.max_body_size == 0 {
            "unlimited".to_string()
        } else {
            (self.max_body_size / 1024 / 1024).to_string()
        }
    }

    /// Converts megabytes to bytes, keeping 0 as "unlimited".
    pub fn mb_to_bytes(mb: usize) -> usize {
        if mb == 0 { 0 } else { mb * 1024 * 1024 }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout: defaults::PROXY_TIMEOUT,
            max_body_size: defaults::MAX_BODY_SIZE,
            public_origin: None,
        }
    }
}

// ============================================================================
// GatewayConfig - concrete configuration
// ============================================================================

/// Complete, immutable gateway configuration.
///
/// Built once at startup (from the environment by the `openrelay` binary,
/// or with the builder methods in tests) and shared behind an `Arc`.
///
/// # Example
///
/// ```
/// use openrelay_core::{AuthenticationProvider, GatewayConfig, SecurityProvider};
///
/// let config = GatewayConfig::default()
///     .with_secret("s3cret")
///     .with_blocked_hosts(vec!["internal."]);
///
/// assert!(config.is_auth_enabled());
/// assert_eq!(config.blocked_hosts(), ["internal.".to_string()]);
/// ```
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub version: String,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub proxy: ProxyConfig,
    pub blocked_hosts: Vec<String>,
    pub removed_headers: Vec<String>,
    pub trusted_proxy_ips: Option<Vec<String>>,
    pub api_key_header: String,
    pub secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            proxy: ProxyConfig::default(),
            blocked_hosts: to_owned_list(defaults::BLOCKED_HOSTS),
            removed_headers: to_owned_list(defaults::REMOVE_HEADERS),
            trusted_proxy_ips: None,
            api_key_header: defaults::API_KEY_HEADER.to_string(),
            secret: None,
        }
    }
}

impl GatewayConfig {
    /// Configure rate limiting.
    pub fn with_rate_limit(mut self, max_requests: u32, window: Duration) -> Self {
        self.rate_limit.max_requests = max_requests;
        self.rate_limit.window_duration = window;
        self
    }

    /// Turn rate limiting off.
    pub fn without_rate_limit(mut self) -> Self {
        self.rate_limit.enabled = false;
        self
    }

    /// Configure the cache.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Configure the shared secret.
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = Some(secret.to_string());
        self
    }

    /// Configure the blocked host list.
    pub fn with_blocked_hosts(mut self, hosts: Vec<&str>) -> Self {
        self.blocked_hosts = hosts.into_iter().map(|h| h.to_lowercase()).collect();
        self
    }

    /// Configure trusted proxy IPs.
    pub fn with_trusted_proxies(mut self, ips: Vec<&str>) -> Self {
        self.trusted_proxy_ips = Some(ips.into_iter().map(String::from).collect());
        self
    }

    /// Configure the externally visible origin.
    pub fn with_public_origin(mut self, origin: &str) -> Self {
        self.proxy.public_origin = Some(origin.trim_end_matches('/').to_string());
        self
    }

    /// Configure the maximum inbound body size in bytes.
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.proxy.max_body_size = bytes;
        self
    }

    /// Configure the reported version.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl RateLimitingProvider for GatewayConfig {
    fn rate_limit_config(&self) -> &RateLimitConfig {
        &self.rate_limit
    }
}

impl CachingProvider for GatewayConfig {
    fn cache_config(&self) -> &CacheConfig {
        &self.cache
    }
}

impl SecurityProvider for GatewayConfig {
    fn blocked_hosts(&self) -> &[String] {
        &self.blocked_hosts
    }

    fn removed_headers(&self) -> &[String] {
        &self.removed_headers
    }

    fn trusted_proxy_ips(&self) -> Option<&[String]> {
        self.trusted_proxy_ips.as_deref()
    }
}

impl ProxyProvider for GatewayConfig {
    fn proxy_config(&self) -> &ProxyConfig {
        &self.proxy
    }

    fn version(&self) -> &str {
        &self.version
    }
}

impl AuthenticationProvider for GatewayConfig {
    fn api_key_header(&self) -> &str {
        &self.api_key_header
    }

    fn shared_secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }
}

// ============================================================================
// Rate limiter state
// ============================================================================

/// Rate limit state for one client.
#[derive(Clone, Debug)]
pub struct RateLimitEntry {
    /// Requests counted in the current window
    pub request_count: u32,
    /// End of the current window; never moved forward while it is running
    pub reset_at: Instant,
}

impl RateLimitEntry {
    /// Opens a new window at `now` with a count of 1.
    pub fn new(now: Instant, window: Duration) -> Self {
        Self {
            request_count: 1,
            reset_at: now + window,
        }
    }
}

/// Thread-safe rate limiter state shared across all connections.
///
/// Wraps a map from client IP to [`RateLimitEntry`]. Uses
/// `tokio::sync::Mutex` so waiting tasks yield instead of blocking a worker.
///
/// # Example
///
/// ```
/// use openrelay_core::RateLimiter;
///
/// let limiter = RateLimiter::new();
/// let shared = limiter.clone();
/// ```
#[derive(Clone, Default)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

impl RateLimiter {
    /// Creates a new empty rate limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the inner mutex-protected map.
    pub fn inner(&self) -> &Arc<Mutex<HashMap<String, RateLimitEntry>>> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_config_valid() {
        assert!(RateLimitConfig::default().is_valid());
    }

    #[test]
    fn test_rate_limit_config_invalid_zero_requests() {
        let config = RateLimitConfig {
            max_requests: 0,
            ..RateLimitConfig::default()
        };
        assert!(!config.is_valid());
    }

    #[test]
    fn test_rate_limit_config_invalid_zero_duration() {
        let config = RateLimitConfig {
            window_duration: Duration::ZERO,
            ..RateLimitConfig::default()
        };
        assert!(!config.is_valid());
    }

    #[test]
    fn test_proxy_config_invalid_zero_timeout() {
        let config = ProxyConfig {
            timeout: Duration::ZERO,
            ..ProxyConfig::default()
        };
        assert!(!config.is_valid());
    }

    #[test]
    fn test_proxy_config_max_body_size_mb() {
        let mut config = ProxyConfig::default();
        assert_eq!(config.max_body_size_mb(), "100");
        config.max_body_size = 0;
        assert_eq!(config.max_body_size_mb(), "unlimited");
    }

    #[test]
    fn test_proxy_config_mb_to_bytes() {
        assert_eq!(ProxyConfig::mb_to_bytes(0), 0);
        assert_eq!(ProxyConfig::mb_to_bytes(1), 1024 * 1024);
        assert_eq!(ProxyConfig::mb_to_bytes(100), 100 * 1024 * 1024);
    }

    #[test]
    fn test_gateway_config_defaults() {
        let config = GatewayConfig::default();
        assert!(!config.is_auth_enabled());
        assert_eq!(config.api_key_header(), "x-api-key");
        assert!(config.blocked_hosts().contains(&"10.".to_string()));
        assert!(config.removed_headers().contains(&"x-api-key".to_string()));
        assert!(config.trusted_proxy_ips().is_none());
        assert_eq!(config.rate_limit_config().max_tracked_clients, 10_000);
        assert_eq!(config.cache_config().ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_empty_secret_disables_auth() {
        let config = GatewayConfig::default().with_secret("");
        assert!(!config.is_auth_enabled());
    }

    #[test]
    fn test_public_origin_trailing_slash_trimmed() {
        let config = GatewayConfig::default().with_public_origin("https://p.io/");
        assert_eq!(config.proxy.public_origin.as_deref(), Some("https://p.io"));
    }

    #[test]
    fn test_rate_limit_entry_new() {
        let now = Instant::now();
        let entry = RateLimitEntry::new(now, Duration::from_secs(60));
        assert_eq!(entry.request_count, 1);
        assert_eq!(entry.reset_at, now + Duration::from_secs(60));
    }

    #[test]
    fn test_rate_limiter_clone() {
        let limiter1 = RateLimiter::new();
        let limiter2 = limiter1.clone();
        assert!(Arc::ptr_eq(limiter1.inner(), limiter2.inner()));
    }

    #[tokio::test]
    async fn test_rate_limiter_new_is_empty() {
        let limiter = RateLimiter::new();
        assert!(limiter.inner().lock().await.is_empty());
    }
}
