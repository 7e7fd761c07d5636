//! HTTP header names and header sets used by OpenRelay.
//!
//! Centralizes every header name the pipeline reads or writes, plus the
//! fixed CORS and no-cache header sets attached to responses.

use hyper::HeaderMap;
use hyper::header::HeaderValue;

/// X-Forwarded-For header - contains the originating client IP chain.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// X-Real-IP header - single client IP set by a fronting proxy.
pub const X_REAL_IP: &str = "x-real-ip";

/// Client IP header set by Cloudflare.
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";

/// Forwarded header (RFC 7239) - standardized proxy header.
pub const FORWARDED: &str = "forwarded";

/// Content-Type header.
pub const CONTENT_TYPE: &str = "content-type";

/// Host header.
pub const HOST: &str = "host";

/// Content-Length header.
pub const CONTENT_LENGTH: &str = "content-length";

/// Location header (redirect target).
pub const LOCATION: &str = "location";

/// User-Agent header.
pub const USER_AGENT: &str = "user-agent";

/// Cache-Control header.
pub const CACHE_CONTROL: &str = "cache-control";

/// Retry-After header (429 responses).
pub const RETRY_AFTER: &str = "retry-after";

/// Marks responses served from the in-memory response cache.
pub const X_PROXY_CACHE: &str = "x-proxy-cache";

/// Connection header (hop-by-hop).
pub const CONNECTION: &str = "connection";

/// Keep-Alive header (hop-by-hop).
pub const KEEP_ALIVE: &str = "keep-alive";

/// Proxy-Authenticate header (hop-by-hop).
pub const PROXY_AUTHENTICATE: &str = "proxy-authenticate";

/// Proxy-Authorization header (hop-by-hop).
pub const PROXY_AUTHORIZATION: &str = "proxy-authorization";

/// TE header (hop-by-hop).
pub const TE: &str = "te";

/// Trailers header (hop-by-hop).
pub const TRAILERS: &str = "trailers";

/// Transfer-Encoding header (hop-by-hop).
pub const TRANSFER_ENCODING: &str = "transfer-encoding";

/// Upgrade header (hop-by-hop).
pub const UPGRADE: &str = "upgrade";

/// List of all hop-by-hop headers that should not be forwarded.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    CONNECTION,
    KEEP_ALIVE,
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILERS,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// Permissive CORS headers attached to every response.
pub const CORS_HEADERS: &[(&str, &str)] = &[
    ("access-control-allow-origin", "*"),
    (
        "access-control-allow-methods",
        "GET, POST, PUT, DELETE, PATCH, OPTIONS, HEAD",
    ),
    ("access-control-allow-headers", "*"),
    ("access-control-max-age", "86400"),
];

/// Headers that keep browsers and intermediaries from caching a response.
pub const NO_CACHE_HEADERS: &[(&str, &str)] = &[
    (
        CACHE_CONTROL,
        "no-store, no-cache, must-revalidate, proxy-revalidate",
    ),
    ("pragma", "no-cache"),
    ("expires", "0"),
];

/// Overwrites `headers` with every `(name, value)` pair of `set`.
pub fn apply(headers: &mut HeaderMap, set: &[(&'static str, &'static str)]) {
    for (name, value) in set {
        headers.insert(*name, HeaderValue::from_static(value));
    }
}

/// Removes hop-by-hop headers in place.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}
