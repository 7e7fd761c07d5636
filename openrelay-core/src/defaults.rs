//! Default configuration values for OpenRelay.
//!
//! Shared by the environment loader and the tests so both agree on what an
//! unconfigured gateway looks like.

use std::time::Duration;

/// Default maximum requests per client within one window.
pub const RATE_LIMIT_REQUESTS: u32 = 100;

/// Default rate limit window duration in seconds.
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Default rate limit window duration.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(RATE_LIMIT_WINDOW_SECS);

/// Number of tracked clients above which the limiter table is cleared.
pub const RATE_LIMIT_MAX_CLIENTS: usize = 10_000;

/// Default cache TTL in seconds.
pub const CACHE_TTL_SECS: u64 = 3600;

/// Default cache TTL.
pub const CACHE_TTL: Duration = Duration::from_secs(CACHE_TTL_SECS);

/// Default number of cached responses kept before eviction kicks in.
pub const CACHE_MAX_ENTRIES: usize = 1_000;

/// Default upstream timeout in seconds.
pub const PROXY_TIMEOUT_SECS: u64 = 30;

/// Default upstream timeout.
pub const PROXY_TIMEOUT: Duration = Duration::from_secs(PROXY_TIMEOUT_SECS);

/// Default maximum inbound body size in megabytes.
pub const MAX_BODY_SIZE_MB: usize = 100;

/// Default maximum inbound body size in bytes.
pub const MAX_BODY_SIZE: usize = MAX_BODY_SIZE_MB * 1024 * 1024;

/// Default maximum concurrent connections.
pub const MAX_CONNECTIONS: usize = 10_000;

/// Default name of the shared-secret header.
pub const API_KEY_HEADER: &str = "x-api-key";

/// User agent injected when the caller did not send one.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Hosts (or literal prefixes) that may never be used as proxy targets.
///
/// Entries ending in `.` block a whole dotted-decimal range by string prefix.
pub const BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "0.0.0.0",
    "10.",
    "172.16.",
    "192.168.",
    "169.254.169.254",
    "::1",
    "metadata.google.internal",
];

/// Request headers stripped before dispatching upstream.
pub const REMOVE_HEADERS: &[&str] = &[
    "cf-connecting-ip",
    "cf-ipcountry",
    "cf-ray",
    "cf-visitor",
    "cf-worker",
    "x-forwarded-for",
    "x-forwarded-proto",
    "x-real-ip",
    API_KEY_HEADER,
];
