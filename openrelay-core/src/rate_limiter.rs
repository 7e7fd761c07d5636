//! Rate limiting implementation for OpenRelay.
//!
//! Per-client fixed-window counters.
//!
//! # Algorithm
//!
//! - The first request from a client opens a window ending at `now + window`
//! - While `now <= reset_at`, requests are counted until `max_requests`
//! - Once `now > reset_at`, the next request opens a fresh window
//! - Denied requests are not counted
//!
//! # Memory Management
//!
//! When more than `max_tracked_clients` clients are tracked, the whole table
//! is dropped before the current request is counted. Clients that were close
//! to their limit get a fresh budget; this keeps memory bounded without any
//! per-entry bookkeeping.
//!
//! # Thread Safety
//!
//! The table sits behind a `tokio::sync::Mutex`, so an increment or reset is
//! atomic with respect to concurrent requests. The lock is released before
//! this function returns and is never held across upstream I/O.

use tokio::time::Instant;
use tracing::debug;

use crate::types::{RateLimitEntry, RateLimiter, RateLimitingProvider};

/// Checks if a request from the given client should be allowed.
///
/// Returns `true` if the request is allowed, `false` if rate limited.
///
/// # Example
///
/// ```
/// use openrelay_core::{GatewayConfig, RateLimiter, rate_limiter::check_rate_limit};
/// use std::time::Duration;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let limiter = RateLimiter::new();
/// let config = GatewayConfig::default().with_rate_limit(1, Duration::from_secs(60));
///
/// assert!(check_rate_limit(&limiter, "203.0.113.7", &config).await);
/// assert!(!check_rate_limit(&limiter, "203.0.113.7", &config).await);
/// # });
/// ```
pub async fn check_rate_limit(
    limiter: &RateLimiter,
    client_id: &str,
    config: &impl RateLimitingProvider,
) -> bool {
    let rate_config = config.rate_limit_config();
    let mut rate_map = limiter.inner().lock().await;
    let now = Instant::now();

    if rate_map.len() > rate_config.max_tracked_clients {
        debug!(
            tracked_clients = rate_map.len(),
            "Rate limiter table over capacity, clearing"
        );
        rate_map.clear();
    }

    match rate_map.get_mut(client_id) {
        Some(entry) if now > entry.reset_at => {
            *entry = RateLimitEntry::new(now, rate_config.window_duration);
            true
        }
        Some(entry) if entry.request_count >= rate_config.max_requests => false,
        Some(entry) => {
            entry.request_count += 1;
            true
        }
        None => {
            rate_map.insert(
                client_id.to_string(),
                RateLimitEntry::new(now, rate_config.window_duration),
            );
            true
        }
    }
}
