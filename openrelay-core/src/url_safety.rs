//! Target URL safety filter.
//!
//! Rejects targets whose host is on the blocked list and targets using any
//! scheme other than `http` or `https`.
//!
//! # Limitations
//!
//! Blocking is a lower-cased string comparison: a host is blocked when it
//! equals, or starts with, a configured entry (`"10."` covers every host
//! spelled `10.x.y.z`). The `url` crate canonicalizes IPv4 literals written
//! in hex, octal or as a single integer, so those spellings are caught too.
//! Everything else is not: DNS names resolving to private addresses, DNS
//! rebinding and IPv4-mapped IPv6 literals all pass. This is a coarse
//! filter, not a complete SSRF defense.

use url::{Host, Url};

/// Outcome of a safety check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyVerdict {
    /// The target may be proxied.
    Safe,
    /// The target must not be proxied.
    Unsafe {
        /// Human-readable explanation.
        reason: String,
    },
}

impl SafetyVerdict {
    /// Returns `true` for [`SafetyVerdict::Safe`].
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Safe)
    }

    fn unsafe_because(reason: impl Into<String>) -> Self {
        Self::Unsafe {
            reason: reason.into(),
        }
    }
}

/// Checks a candidate target URL against the blocked host list.
///
/// Fails closed: anything that does not parse is unsafe.
///
/// # Example
///
/// ```
/// use openrelay_core::url_safety::check;
///
/// let blocked = vec!["localhost".to_string(), "10.".to_string()];
///
/// assert!(check("https://example.com", &blocked).is_safe());
/// assert!(!check("http://10.0.0.8/admin", &blocked).is_safe());
/// assert!(!check("ftp://example.com", &blocked).is_safe());
/// ```
pub fn check(candidate: &str, blocked_hosts: &[String]) -> SafetyVerdict {
    let Ok(url) = Url::parse(candidate) else {
        return SafetyVerdict::unsafe_because("Invalid URL format");
    };

    let hostname = hostname(&url);
    if let Some(blocked) = blocked_hosts
        .iter()
        .find(|blocked| hostname == **blocked || hostname.starts_with(blocked.as_str()))
    {
        tracing::debug!(host = %hostname, entry = %blocked, "Blocked host matched");
        return SafetyVerdict::unsafe_because(format!(
            "Access to {hostname} is blocked for security reasons"
        ));
    }

    if !matches!(url.scheme(), "http" | "https") {
        return SafetyVerdict::unsafe_because(format!(
            "Protocol {}: is not supported",
            url.scheme()
        ));
    }

    SafetyVerdict::Safe
}

/// Lower-cased host of `url`, with IPv6 literals rendered without brackets.
fn hostname(url: &Url) -> String {
    match url.host() {
        Some(Host::Domain(domain)) => domain.to_lowercase(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::BLOCKED_HOSTS;

    fn default_blocked() -> Vec<String> {
        BLOCKED_HOSTS.iter().map(|s| s.to_string()).collect()
    }

    fn assert_blocked(url: &str) {
        let verdict = check(url, &default_blocked());
        assert!(!verdict.is_safe(), "{url} should be blocked");
    }

    #[test]
    fn test_public_http_and_https_safe() {
        assert_eq!(check("http://example.com", &default_blocked()), SafetyVerdict::Safe);
        assert_eq!(check("https://example.com", &default_blocked()), SafetyVerdict::Safe);
        assert!(check("https://raw.githubusercontent.com/u/r/main/f.txt", &default_blocked()).is_safe());
    }

    #[test]
    fn test_unsupported_scheme() {
        let verdict = check("ftp://example.com", &default_blocked());
        assert_eq!(
            verdict,
            SafetyVerdict::Unsafe {
                reason: "Protocol ftp: is not supported".into()
            }
        );
        assert_blocked("file:///etc/passwd");
        assert_blocked("gopher://example.com/");
    }

    #[test]
    fn test_invalid_url() {
        let verdict = check("not a url", &default_blocked());
        assert_eq!(
            verdict,
            SafetyVerdict::Unsafe {
                reason: "Invalid URL format".into()
            }
        );
        assert_blocked("https://");
    }

    #[test]
    fn test_exact_blocked_hosts() {
        assert_blocked("http://localhost/");
        assert_blocked("http://localhost:8080/admin");
        assert_blocked("http://127.0.0.1/");
        assert_blocked("http://0.0.0.0/");
        assert_blocked("http://169.254.169.254/latest/meta-data/");
        assert_blocked("http://metadata.google.internal/computeMetadata/v1/");
        assert_blocked("http://[::1]:3000/");
    }

    #[test]
    fn test_prefix_blocked_ranges() {
        assert_blocked("http://10.0.0.1/");
        assert_blocked("http://10.255.255.255/");
        assert_blocked("http://172.16.4.2/");
        assert_blocked("https://192.168.1.1/router");
    }

    #[test]
    fn test_blocked_host_case_insensitive() {
        assert_blocked("http://LOCALHOST/");
        assert_blocked("http://Metadata.Google.Internal/");
    }

    #[test]
    fn test_reason_names_host() {
        let verdict = check("http://192.168.0.10/", &default_blocked());
        assert_eq!(
            verdict,
            SafetyVerdict::Unsafe {
                reason: "Access to 192.168.0.10 is blocked for security reasons".into()
            }
        );
    }

    #[test]
    fn test_alternate_ipv4_spellings_are_canonicalized() {
        // The URL parser turns these into 127.0.0.1 / 10.0.0.1 before matching.
        assert_blocked("http://0x7f.0.0.1/");
        assert_blocked("http://2130706433/");
        assert_blocked("http://012.0.0.1/");
    }

    #[test]
    fn test_prefix_check_is_string_based() {
        // Hosts merely starting with a blocked prefix are rejected too.
        assert_blocked("http://localhost.example.com/");
        // 172.17.x is private but not on the default list.
        assert!(check("http://172.17.0.1/", &default_blocked()).is_safe());
        // Names resolving to private space are not detected.
        assert!(check("http://internal.example.com/", &default_blocked()).is_safe());
    }

    #[test]
    fn test_empty_blocklist_allows_loopback() {
        assert!(check("http://127.0.0.1:9000/", &[]).is_safe());
    }
}
