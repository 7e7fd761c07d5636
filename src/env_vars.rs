//! Environment variable names used throughout OpenRelay configuration

/// Authentication
pub const SECRET: &str = "SECRET";
pub const API_KEY_HEADER: &str = "API_KEY_HEADER";

/// Rate limiting configuration
pub const RATE_LIMIT_ENABLED: &str = "RATE_LIMIT_ENABLED";
pub const RATE_LIMIT_REQUESTS: &str = "RATE_LIMIT_REQUESTS";
pub const RATE_LIMIT_WINDOW_SECS: &str = "RATE_LIMIT_WINDOW_SECS";
pub const RATE_LIMIT_MAX_CLIENTS: &str = "RATE_LIMIT_MAX_CLIENTS";

/// Response cache configuration
pub const CACHE_ENABLED: &str = "CACHE_ENABLED";
pub const CACHE_TTL_SECS: &str = "CACHE_TTL_SECS";
pub const CACHE_EVERYTHING: &str = "CACHE_EVERYTHING";
pub const CACHE_MAX_ENTRIES: &str = "CACHE_MAX_ENTRIES";

/// Target and header filtering
pub const BLOCKED_HOSTS: &str = "BLOCKED_HOSTS";
pub const REMOVE_HEADERS: &str = "REMOVE_HEADERS";
pub const TRUSTED_PROXY_IPS: &str = "TRUSTED_PROXY_IPS";

/// Proxy behavior configuration
pub const PUBLIC_ORIGIN: &str = "PUBLIC_ORIGIN";
pub const PROXY_TIMEOUT_SECS: &str = "PROXY_TIMEOUT_SECS";
pub const MAX_BODY_SIZE_MB: &str = "MAX_BODY_SIZE_MB";
pub const MAX_CONNECTIONS: &str = "MAX_CONNECTIONS";

/// Get all environment variable names for documentation/validation
pub fn all_env_vars() -> &'static [&'static str] {
    &[
        SECRET,
        API_KEY_HEADER,
        RATE_LIMIT_ENABLED,
        RATE_LIMIT_REQUESTS,
        RATE_LIMIT_WINDOW_SECS,
        RATE_LIMIT_MAX_CLIENTS,
        CACHE_ENABLED,
        CACHE_TTL_SECS,
        CACHE_EVERYTHING,
        CACHE_MAX_ENTRIES,
        BLOCKED_HOSTS,
        REMOVE_HEADERS,
        TRUSTED_PROXY_IPS,
        PUBLIC_ORIGIN,
        PROXY_TIMEOUT_SECS,
        MAX_BODY_SIZE_MB,
        MAX_CONNECTIONS,
    ]
}

/// Variables whose values must never be printed.
pub fn is_sensitive(var_name: &str) -> bool {
    var_name == SECRET || var_name.contains("IP")
}
