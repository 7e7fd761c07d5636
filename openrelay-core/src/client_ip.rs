//! Client identification for rate limiting.
//!
//! The rate-limit key is the client IP. By default that is the TCP peer.
//! Only when the peer is a configured trusted proxy are client-IP headers
//! believed, in this order:
//!
//! 1. `cf-connecting-ip`
//! 2. `x-real-ip`
//! 3. the last valid address in `x-forwarded-for`
//! 4. the `for=` node of the first RFC 7239 `forwarded` element
//!
//! Anything unparsable falls through to the next source and finally to the
//! peer address, so a spoofed header from an untrusted peer never changes
//! the key.

use std::net::{IpAddr, SocketAddr};

use hyper::HeaderMap;

use crate::headers;

/// Returns the rate-limit key for a request.
///
/// # Example
///
/// ```
/// use hyper::HeaderMap;
/// use openrelay_core::client_ip::client_id;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-real-ip", "198.51.100.7".parse().unwrap());
/// let peer = "10.0.0.2:41000".parse().unwrap();
///
/// // Untrusted peer: headers are ignored.
/// assert_eq!(client_id(&headers, peer, None), "10.0.0.2");
///
/// let trusted = vec!["10.0.0.2".to_string()];
/// assert_eq!(client_id(&headers, peer, Some(&trusted)), "198.51.100.7");
/// ```
pub fn client_id(headers: &HeaderMap, peer: SocketAddr, trusted: Option<&[String]>) -> String {
    let peer_ip = peer.ip().to_string();

    let peer_trusted = trusted.is_some_and(|ips| ips.iter().any(|ip| *ip == peer_ip));
    if !peer_trusted {
        return peer_ip;
    }

    header_str(headers, headers::CF_CONNECTING_IP)
        .and_then(single_ip)
        .or_else(|| header_str(headers, headers::X_REAL_IP).and_then(single_ip))
        .or_else(|| header_str(headers, headers::X_FORWARDED_FOR).and_then(extract_client_ip_from_xff))
        .or_else(|| header_str(headers, headers::FORWARDED).and_then(extract_client_ip_from_forwarded))
        .unwrap_or(peer_ip)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

fn single_ip(value: &str) -> Option<String> {
    let value = value.trim();
    is_valid_ip_format(value).then(|| value.to_string())
}

/// Last valid IP in an `x-forwarded-for` chain: the address the nearest
/// trusted proxy saw.
fn extract_client_ip_from_xff(xff: &str) -> Option<String> {
    xff.split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .rfind(|ip| is_valid_ip_format(ip))
        .map(str::to_string)
}

/// `for=` parameter of the first element of a `forwarded` header.
/// Elements are separated by ',' and parameters within an element by ';'.
fn extract_client_ip_from_forwarded(forwarded: &str) -> Option<String> {
    forwarded
        .split(',')
        .next()
        .and_then(|element| {
            element.split(';').find_map(|param| {
                let (key, value) = param.trim().split_once('=')?;
                key.eq_ignore_ascii_case("for").then_some(value)
            })
        })
        .and_then(extract_ip_from_node_identifier)
}

/// IP address of an RFC 7239 node identifier.
/// Handles IP, "IP:port", "[IPv6]", "[IPv6]:port" and quoted values;
/// obfuscated (`_x`) and `unknown` nodes yield `None`.
fn extract_ip_from_node_identifier(value: &str) -> Option<String> {
    let value = value.trim().trim_matches('"');

    if value.eq_ignore_ascii_case("unknown") || value.starts_with('_') {
        return None;
    }

    if let Some(rest) = value.strip_prefix('[') {
        let (ipv6, _) = rest.split_once(']')?;
        return single_ip(ipv6);
    }

    // One colon is IPv4 with a port; more is a bare IPv6 address.
    match value.matches(':').count() {
        1 => value.split_once(':').and_then(|(ip, _)| single_ip(ip)),
        _ => single_ip(value),
    }
}

fn is_valid_ip_format(ip: &str) -> bool {
    !ip.is_empty() && ip.parse::<IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    const PROXY: &str = "10.0.0.2:41000";

    fn peer() -> SocketAddr {
        PROXY.parse().unwrap()
    }

    fn trusted() -> Vec<String> {
        vec!["10.0.0.2".to_string()]
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    // ===========================================
    // Trust decision tests
    // ===========================================

    #[test]
    fn test_untrusted_peer_ignores_headers() {
        let h = headers(&[
            ("cf-connecting-ip", "203.0.113.1"),
            ("x-forwarded-for", "203.0.113.2"),
        ]);
        assert_eq!(client_id(&h, peer(), None), "10.0.0.2");
        assert_eq!(
            client_id(&h, peer(), Some(&["10.0.0.9".to_string()])),
            "10.0.0.2"
        );
    }

    #[test]
    fn test_trusted_peer_without_headers_uses_peer() {
        assert_eq!(client_id(&HeaderMap::new(), peer(), Some(&trusted())), "10.0.0.2");
    }

    #[test]
    fn test_ipv6_peer() {
        let peer: SocketAddr = "[2001:db8::1]:443".parse().unwrap();
        assert_eq!(client_id(&HeaderMap::new(), peer, None), "2001:db8::1");
    }

    // ===========================================
    // Header precedence tests
    // ===========================================

    #[test]
    fn test_cf_connecting_ip_first() {
        let h = headers(&[
            ("cf-connecting-ip", "203.0.113.1"),
            ("x-real-ip", "203.0.113.2"),
            ("x-forwarded-for", "203.0.113.3"),
        ]);
        assert_eq!(client_id(&h, peer(), Some(&trusted())), "203.0.113.1");
    }

    #[test]
    fn test_x_real_ip_second() {
        let h = headers(&[("x-real-ip", "203.0.113.2"), ("x-forwarded-for", "203.0.113.3")]);
        assert_eq!(client_id(&h, peer(), Some(&trusted())), "203.0.113.2");
    }

    #[test]
    fn test_invalid_header_falls_through() {
        let h = headers(&[
            ("cf-connecting-ip", "not-an-ip"),
            ("x-forwarded-for", "203.0.113.3"),
        ]);
        assert_eq!(client_id(&h, peer(), Some(&trusted())), "203.0.113.3");
    }

    #[test]
    fn test_forwarded_used_last() {
        let h = headers(&[("forwarded", "for=203.0.113.4;proto=https")]);
        assert_eq!(client_id(&h, peer(), Some(&trusted())), "203.0.113.4");
    }

    // ===========================================
    // x-forwarded-for parsing tests
    // ===========================================

    #[test]
    fn test_xff_last_valid_entry() {
        assert_eq!(
            extract_client_ip_from_xff("198.51.100.1, 203.0.113.9"),
            Some("203.0.113.9".to_string())
        );
        assert_eq!(
            extract_client_ip_from_xff("198.51.100.1, garbage, "),
            Some("198.51.100.1".to_string())
        );
        assert_eq!(extract_client_ip_from_xff("garbage"), None);
        assert_eq!(extract_client_ip_from_xff(""), None);
    }

    #[test]
    fn test_xff_ipv6() {
        assert_eq!(
            extract_client_ip_from_xff("2001:db8::5"),
            Some("2001:db8::5".to_string())
        );
    }

    // ===========================================
    // forwarded parsing tests
    // ===========================================

    #[test]
    fn test_forwarded_first_element() {
        assert_eq!(
            extract_client_ip_from_forwarded("for=192.0.2.60;by=203.0.113.43, for=198.51.100.17"),
            Some("192.0.2.60".to_string())
        );
    }

    #[test]
    fn test_forwarded_case_insensitive_key() {
        assert_eq!(
            extract_client_ip_from_forwarded("proto=http; For=192.0.2.60"),
            Some("192.0.2.60".to_string())
        );
    }

    #[test]
    fn test_forwarded_missing_for() {
        assert_eq!(extract_client_ip_from_forwarded("by=203.0.113.43"), None);
    }

    #[test]
    fn test_node_identifiers() {
        assert_eq!(
            extract_ip_from_node_identifier("192.0.2.60:8080"),
            Some("192.0.2.60".to_string())
        );
        assert_eq!(
            extract_ip_from_node_identifier("\"[2001:db8:cafe::17]:4711\""),
            Some("2001:db8:cafe::17".to_string())
        );
        assert_eq!(
            extract_ip_from_node_identifier("[2001:db8::1]"),
            Some("2001:db8::1".to_string())
        );
        assert_eq!(
            extract_ip_from_node_identifier("2001:db8::1"),
            Some("2001:db8::1".to_string())
        );
        assert_eq!(extract_ip_from_node_identifier("unknown"), None);
        assert_eq!(extract_ip_from_node_identifier("_hidden"), None);
        assert_eq!(extract_ip_from_node_identifier("[not-ip]"), None);
        assert_eq!(extract_ip_from_node_identifier("host:80"), None);
    }
}
