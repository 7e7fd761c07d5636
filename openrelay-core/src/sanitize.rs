//! Request header sanitizing.
//!
//! Removes headers that identify the caller or the gateway (client IP
//! headers, edge metadata, the gateway's own API key) before a request is
//! forwarded, and makes sure every forwarded request carries a browser-like
//! user agent.

use hyper::HeaderMap;
use hyper::header::HeaderValue;

use crate::defaults;
use crate::headers;

/// Returns a cleaned copy of `headers`.
///
/// Every header named in `remove` is dropped (names are matched
/// case-insensitively). If no `user-agent` remains afterwards, a desktop
/// Chrome user agent is inserted. The input map is left untouched.
///
/// # Example
///
/// ```
/// use hyper::HeaderMap;
/// use openrelay_core::sanitize::clean_headers;
///
/// let mut inbound = HeaderMap::new();
/// inbound.insert("x-forwarded-for", "198.51.100.4".parse().unwrap());
///
/// let cleaned = clean_headers(&inbound, &["x-forwarded-for".to_string()]);
///
/// assert!(cleaned.get("x-forwarded-for").is_none());
/// assert!(cleaned.get("user-agent").is_some());
/// assert!(inbound.get("x-forwarded-for").is_some());
/// ```
pub fn clean_headers(headers: &HeaderMap, remove: &[String]) -> HeaderMap {
    let mut cleaned = headers.clone();

    for name in remove {
        cleaned.remove(name.to_ascii_lowercase().as_str());
    }

    if !cleaned.contains_key(headers::USER_AGENT) {
        cleaned.insert(
            headers::USER_AGENT,
            HeaderValue::from_static(defaults::USER_AGENT),
        );
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_removals() -> Vec<String> {
        defaults::REMOVE_HEADERS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_forwarded_for_removed_and_user_agent_added() {
        let mut inbound = HeaderMap::new();
        inbound.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));

        let cleaned = clean_headers(&inbound, &default_removals());

        assert!(cleaned.get("x-forwarded-for").is_none());
        assert_eq!(cleaned["user-agent"], defaults::USER_AGENT);
    }

    #[test]
    fn test_existing_user_agent_kept() {
        let mut inbound = HeaderMap::new();
        inbound.insert("user-agent", HeaderValue::from_static("curl/8.5.0"));

        let cleaned = clean_headers(&inbound, &default_removals());

        assert_eq!(cleaned["user-agent"], "curl/8.5.0");
    }

    #[test]
    fn test_all_default_headers_removed() {
        let mut inbound = HeaderMap::new();
        for name in defaults::REMOVE_HEADERS {
            inbound.insert(*name, HeaderValue::from_static("value"));
        }
        inbound.insert("accept", HeaderValue::from_static("text/html"));

        let cleaned = clean_headers(&inbound, &default_removals());

        for name in defaults::REMOVE_HEADERS {
            assert!(cleaned.get(*name).is_none(), "{name} should be removed");
        }
        assert_eq!(cleaned["accept"], "text/html");
    }

    #[test]
    fn test_multi_valued_header_fully_removed() {
        let mut inbound = HeaderMap::new();
        inbound.append("x-forwarded-for", HeaderValue::from_static("198.51.100.1"));
        inbound.append("x-forwarded-for", HeaderValue::from_static("198.51.100.2"));

        let cleaned = clean_headers(&inbound, &default_removals());

        assert_eq!(cleaned.get_all("x-forwarded-for").iter().count(), 0);
    }

    #[test]
    fn test_removal_names_case_insensitive() {
        let mut inbound = HeaderMap::new();
        inbound.insert("x-internal-token", HeaderValue::from_static("abc"));

        let cleaned = clean_headers(&inbound, &["X-Internal-Token".to_string()]);

        assert!(cleaned.get("x-internal-token").is_none());
    }

    #[test]
    fn test_input_untouched() {
        let mut inbound = HeaderMap::new();
        inbound.insert("x-api-key", HeaderValue::from_static("secret"));

        let _ = clean_headers(&inbound, &default_removals());

        assert_eq!(inbound["x-api-key"], "secret");
        assert!(inbound.get("user-agent").is_none());
    }
}
