//! In-memory response cache.
//!
//! Stores successful upstream responses keyed by target URL for the TTL
//! carried in each request's [`CacheHint`](crate::transport::CacheHint).
//! Requests carrying `authorization` or `cookie` bypass it, and responses
//! setting cookies are never stored.
//!
//! # Eviction
//!
//! Expired entries are dropped when they are looked up. When an insert
//! pushes the table past `max_entries`, every expired entry is purged, and
//! if the table is still too large it is cleared entirely. Same coarse
//! policy as the rate limiter: bounded memory, no LRU bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use hyper::HeaderMap;
use hyper::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::headers;
use crate::rewrite;
use crate::transport::UpstreamResponse;

#[derive(Clone, Debug)]
struct CachedEntry {
    response: UpstreamResponse,
    expires_at: Instant,
}

/// Shared TTL cache of upstream responses.
///
/// Cloning is cheap and every clone sees the same entries.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bytes::Bytes;
/// use hyper::{HeaderMap, StatusCode};
/// use openrelay_core::cache::ResponseCache;
/// use openrelay_core::transport::UpstreamResponse;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let cache = ResponseCache::new(100);
/// let response = UpstreamResponse {
///     status: StatusCode::OK,
///     headers: HeaderMap::new(),
///     body: Bytes::from_static(b"hello"),
/// };
///
/// cache.put("https://example.com/".into(), response, Duration::from_secs(60)).await;
/// assert!(cache.get("https://example.com/").await.is_some());
/// # });
/// ```
#[derive(Clone, Default)]
pub struct ResponseCache {
    inner: Arc<Mutex<HashMap<String, CachedEntry>>>,
    /// Entry count above which the table is pruned (0 = unbounded)
    max_entries: usize,
}

impl ResponseCache {
    /// Creates an empty cache.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Arc::default(),
            max_entries,
        }
    }

    /// Returns a fresh entry for `key`, dropping it if it has expired.
    pub async fn get(&self, key: &str) -> Option<UpstreamResponse> {
        let mut entries = self.inner.lock().await;
        let entry = entries.get(key)?;

        if Instant::now() >= entry.expires_at {
            entries.remove(key);
            debug!(key, "Cache entry expired");
            return None;
        }

        Some(entry.response.clone())
    }

    /// Stores `response` under `key` for `ttl`.
    pub async fn put(&self, key: String, response: UpstreamResponse, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.inner.lock().await;

        entries.insert(
            key,
            CachedEntry {
                response,
                expires_at: now + ttl,
            },
        );

        if self.max_entries > 0 && entries.len() > self.max_entries {
            entries.retain(|_, entry| entry.expires_at > now);
            if entries.len() > self.max_entries {
                debug!(entries = entries.len(), "Response cache over capacity, clearing");
                entries.clear();
            } else {
                debug!(entries = entries.len(), "Purged expired cache entries");
            }
        }
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

/// Returns `true` if the outbound request carries caller credentials.
///
/// Such requests may see per-user content and never touch the shared cache.
pub fn carries_credentials(request_headers: &HeaderMap) -> bool {
    request_headers.contains_key(AUTHORIZATION) || request_headers.contains_key(COOKIE)
}

/// Decides whether an upstream response may be stored.
///
/// Only `200 OK` without `set-cookie` is ever stored. Unless
/// `cache_everything` is set, responses marked `no-store`, `no-cache` or
/// `private`, and HTML pages, are skipped as well.
pub fn is_cacheable(response: &UpstreamResponse, cache_everything: bool) -> bool {
    if response.status != hyper::StatusCode::OK || response.headers.contains_key(SET_COOKIE) {
        return false;
    }
    if cache_everything {
        return true;
    }

    let cache_control = header_lowercase(response, headers::CACHE_CONTROL);
    if ["no-store", "no-cache", "private"]
        .iter()
        .any(|directive| cache_control.contains(directive))
    {
        return false;
    }

    !rewrite::is_html(&header_lowercase(response, headers::CONTENT_TYPE))
}

fn header_lowercase(response: &UpstreamResponse, name: &str) -> String {
    response
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}
