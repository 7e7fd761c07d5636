//! Target URL resolution.
//!
//! A caller names the resource to proxy in one of three ways:
//!
//! 1. `/?url=https://example.com/x` - query parameter
//! 2. `/https://example.com/x` or `/example.com/x` - embedded in the path
//! 3. Classic forward-proxy addressing, where the request line carries an
//!    absolute URL for a host other than the gateway
//!
//! This module also reconstructs the inbound URL and the gateway's own
//! origin from the request line and `Host` header.

use hyper::{HeaderMap, Uri};
use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{ProxyError, Result};
use crate::headers;

/// Returns the origin the gateway is reachable at.
///
/// A configured public origin wins. Otherwise the `Host` header of an
/// origin-form request is used, and `fallback_authority` (the local listen
/// address) covers requests without one.
pub fn proxy_origin(
    public_origin: Option<&str>,
    uri: &Uri,
    headers: &HeaderMap,
    fallback_authority: &str,
) -> String {
    if let Some(origin) = public_origin {
        return origin.trim_end_matches('/').to_string();
    }

    let host = if uri.authority().is_some() {
        None
    } else {
        host_header(headers)
    };
    format!("http://{}", host.unwrap_or(fallback_authority))
}

/// Builds the full URL of an inbound request.
///
/// Absolute-form request targets (forward-proxy requests) are used as-is;
/// origin-form targets are resolved against `proxy_origin`.
pub fn inbound_url(uri: &Uri, proxy_origin: &str) -> Result<Url> {
    let raw = if uri.scheme().is_some() && uri.authority().is_some() {
        uri.to_string()
    } else {
        let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
        format!("{proxy_origin}{path_and_query}")
    };

    Url::parse(&raw).map_err(|e| ProxyError::InvalidRequest(format!("unparsable request URL {raw}: {e}")))
}

/// Derives the target URL from an inbound request.
///
/// Resolution order, first match wins:
/// 1. A non-empty `url` query parameter, verbatim
/// 2. A non-root path: percent-decoded, leading slash stripped, `https://`
///    prepended unless a scheme is present, original query re-appended
/// 3. A `Host` header naming another host than the inbound URL: the whole
///    inbound URL
///
/// Returns `None` when none of these apply.
///
/// # Example
///
/// ```
/// use hyper::HeaderMap;
/// use openrelay_core::target::extract_target;
/// use url::Url;
///
/// let headers = HeaderMap::new();
/// let inbound = Url::parse("https://p.io/example.com/page").unwrap();
///
/// assert_eq!(
///     extract_target(&headers, &inbound).as_deref(),
///     Some("https://example.com/page")
/// );
/// ```
pub fn extract_target(headers: &HeaderMap, inbound: &Url) -> Option<String> {
    if let Some((_, target)) = inbound
        .query_pairs()
        .find(|(key, value)| key == "url" && !value.is_empty())
    {
        return Some(target.into_owned());
    }

    if inbound.path() != "/" {
        let decoded = percent_decode_str(&inbound.path()[1..]).decode_utf8_lossy();
        let mut target = if decoded.starts_with("http://") || decoded.starts_with("https://") {
            decoded.into_owned()
        } else {
            format!("https://{decoded}")
        };

        if let Some(query) = inbound.query().filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(query);
        }

        return Some(target);
    }

    if let Some(host) = host_header(headers)
        && !host.eq_ignore_ascii_case(&authority(inbound))
    {
        return Some(inbound.to_string());
    }

    None
}

fn host_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(headers::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
}

/// `host[:port]` of `url`, port omitted when it is the scheme default.
fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
