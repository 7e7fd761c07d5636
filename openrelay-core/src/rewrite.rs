//! Response rewriting.
//!
//! Keeps browsers inside the gateway after they follow a link or a redirect:
//!
//! - `Location` headers of redirects are resolved against the target and
//!   re-addressed to `<proxy-origin>/<percent-encoded absolute URL>`
//! - `href`, `src` and `action` attributes in HTML that start with `/` or
//!   `//` are re-anchored through the gateway
//!
//! # HTML rewriting is textual
//!
//! The HTML pass is two regex substitutions over the raw bytes, not a DOM
//! rewrite. It also rewrites matching text inside `<script>` blocks and
//! comments, misses relative URLs without a leading slash, and is not
//! idempotent: feeding its output back in nests the gateway prefix again.

use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::bytes::{Captures, Regex};
use url::Url;

use crate::error::{ProxyError, Result};

/// Characters escaped in a path-embedded target, matching JavaScript's
/// `encodeURIComponent` so browsers and scripts produce the same links.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Attribute value starting with exactly one slash. The byte after the slash
/// is captured because the regex engine has no lookahead.
static ROOT_RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)((?:href|src|action)=["'])/((?-u:[^/])|$)"#).expect("valid root-relative regex")
});

/// Attribute value starting with `//`.
static PROTOCOL_RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)((?:href|src|action)=["'])//"#).expect("valid protocol-relative regex")
});

/// HTTP statuses whose `Location` header is rewritten.
pub const REDIRECT_STATUSES: &[u16] = &[301, 302, 303, 307, 308];

/// Returns `true` if `status` is a redirect the gateway rewrites.
pub fn is_redirect(status: u16) -> bool {
    REDIRECT_STATUSES.contains(&status)
}

/// Re-addresses a redirect `location` so the follow-up request comes back
/// through the gateway.
///
/// # Errors
///
/// Returns [`ProxyError::Upstream`] if `location` cannot be resolved
/// against `target`.
///
/// # Example
///
/// ```
/// use openrelay_core::rewrite::rewrite_location;
/// use url::Url;
///
/// let target = Url::parse("https://site.com/app").unwrap();
/// let location = rewrite_location("/login", &target, "https://p.io").unwrap();
///
/// assert_eq!(location, "https://p.io/https%3A%2F%2Fsite.com%2Flogin");
/// ```
pub fn rewrite_location(location: &str, target: &Url, proxy_origin: &str) -> Result<String> {
    let absolute = target.join(location).map_err(|e| {
        ProxyError::Upstream(format!("unresolvable redirect location {location:?}: {e}"))
    })?;

    Ok(format!(
        "{proxy_origin}/{}",
        utf8_percent_encode(absolute.as_str(), COMPONENT)
    ))
}

/// Rewrites root-relative and protocol-relative links in an HTML document.
///
/// - `href="/path"` becomes `href="<proxy_origin>/<target origin>/path"`
/// - `src="//cdn.io/x"` becomes `src="<proxy_origin>/https://cdn.io/x"`
///
/// # Example
///
/// ```
/// use openrelay_core::rewrite::rewrite_html;
/// use url::Url;
///
/// let target = Url::parse("https://t.io/docs/").unwrap();
/// let html = rewrite_html(br#"<a href="/path">"#, "https://p.io", &target);
///
/// assert_eq!(html, br#"<a href="https://p.io/https://t.io/path">"#);
/// ```
pub fn rewrite_html(html: &[u8], proxy_origin: &str, target: &Url) -> Vec<u8> {
    let target_origin = target.origin().ascii_serialization();
    let anchored = format!("{proxy_origin}/{target_origin}/");
    let protocol_relative = format!("{proxy_origin}/https://");

    // Root-relative first: its output never starts with a slash, so the
    // protocol-relative pass cannot touch it again.
    let pass_one = ROOT_RELATIVE.replace_all(html, |caps: &Captures| {
        let mut out = caps[1].to_vec();
        out.extend_from_slice(anchored.as_bytes());
        out.extend_from_slice(&caps[2]);
        out
    });

    PROTOCOL_RELATIVE
        .replace_all(&pass_one, |caps: &Captures| {
            let mut out = caps[1].to_vec();
            out.extend_from_slice(protocol_relative.as_bytes());
            out
        })
        .into_owned()
}

/// Returns `true` for content types the HTML pass applies to.
pub fn is_html(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(html: &str, target: &str) -> String {
        let target = Url::parse(target).unwrap();
        String::from_utf8(rewrite_html(html.as_bytes(), "https://p.io", &target)).unwrap()
    }

    // ===========================================
    // rewrite_html tests
    // ===========================================

    #[test]
    fn test_root_relative_href() {
        assert_eq!(
            rewrite(r#"<a href="/path">"#, "https://t.io/"),
            r#"<a href="https://p.io/https://t.io/path">"#
        );
    }

    #[test]
    fn test_protocol_relative_src() {
        assert_eq!(
            rewrite(r#"<img src="//cdn.io/x.png">"#, "https://t.io/"),
            r#"<img src="https://p.io/https://cdn.io/x.png">"#
        );
    }

    #[test]
    fn test_action_and_single_quotes() {
        assert_eq!(
            rewrite("<form action='/submit'>", "https://t.io/a/b"),
            "<form action='https://p.io/https://t.io/submit'>"
        );
    }

    #[test]
    fn test_bare_root_link() {
        assert_eq!(
            rewrite(r#"<a href="/">home</a>"#, "https://t.io/"),
            r#"<a href="https://p.io/https://t.io/">home</a>"#
        );
    }

    #[test]
    fn test_case_insensitive_attributes() {
        assert_eq!(
            rewrite(r#"<A HREF="/x"><IMG SRC="//c.io/y">"#, "https://t.io/"),
            r#"<A HREF="https://p.io/https://t.io/x"><IMG SRC="https://p.io/https://c.io/y">"#
        );
    }

    #[test]
    fn test_target_port_kept_in_origin() {
        assert_eq!(
            rewrite(r#"<script src="/app.js"></script>"#, "http://t.io:8080/index.html"),
            r#"<script src="https://p.io/http://t.io:8080/app.js"></script>"#
        );
    }

    #[test]
    fn test_absolute_and_relative_links_untouched() {
        let html = r##"<a href="https://other.io/x"><a href="page.html"><a href="#top">"##;
        assert_eq!(rewrite(html, "https://t.io/"), html);
    }

    #[test]
    fn test_multiple_links_rewritten() {
        let html = r#"<link href="/a.css"><script src="/b.js"></script><img src="//c.io/d.png">"#;
        assert_eq!(
            rewrite(html, "https://t.io/"),
            concat!(
                r#"<link href="https://p.io/https://t.io/a.css">"#,
                r#"<script src="https://p.io/https://t.io/b.js"></script>"#,
                r#"<img src="https://p.io/https://c.io/d.png">"#
            )
        );
    }

    #[test]
    fn test_script_text_also_rewritten() {
        // Textual matching does not know it is inside a script.
        assert_eq!(
            rewrite(r#"<script>el.innerHTML = '<a href="/x">';</script>"#, "https://t.io/"),
            r#"<script>el.innerHTML = '<a href="https://p.io/https://t.io/x">';</script>"#
        );
    }

    #[test]
    fn test_not_idempotent() {
        let once = rewrite(r#"<img src="//cdn.io/x.png">"#, "https://t.io/");
        let twice = rewrite(&once, "https://t.io/");
        // Already absolute, so a second pass leaves it alone...
        assert_eq!(once, twice);

        // ...but a rewritten page re-served through the gateway as a
        // root-relative link gets prefixed again.
        let nested = rewrite(r#"<a href="/https://p.io/https://t.io/x">"#, "https://t.io/");
        assert_eq!(
            nested,
            r#"<a href="https://p.io/https://t.io/https://p.io/https://t.io/x">"#
        );
    }

    #[test]
    fn test_non_utf8_bytes_preserved() {
        let target = Url::parse("https://t.io/").unwrap();
        let mut html = b"<p>\xe9t\xe9</p><a href=\"/x\">".to_vec();
        let out = rewrite_html(&html, "https://p.io", &target);
        html.truncate(16);
        assert!(out.starts_with(&html));
        assert!(out.ends_with(b"href=\"https://p.io/https://t.io/x\">"));
    }

    #[test]
    fn test_invalid_utf8_after_slash_rewritten() {
        let target = Url::parse("https://t.io/").unwrap();
        let out = rewrite_html(b"<a href=\"/\xff\xfe.html\">", "https://p.io", &target);
        assert_eq!(out, b"<a href=\"https://p.io/https://t.io/\xff\xfe.html\">".to_vec());
    }

    // ===========================================
    // rewrite_location tests
    // ===========================================

    #[test]
    fn test_location_root_relative() {
        let target = Url::parse("https://site.com/app").unwrap();
        assert_eq!(
            rewrite_location("/login", &target, "https://p.io").unwrap(),
            "https://p.io/https%3A%2F%2Fsite.com%2Flogin"
        );
    }

    #[test]
    fn test_location_absolute_with_query() {
        let target = Url::parse("https://site.com/app").unwrap();
        assert_eq!(
            rewrite_location("https://auth.io/cb?next=/home&x=1", &target, "https://p.io").unwrap(),
            "https://p.io/https%3A%2F%2Fauth.io%2Fcb%3Fnext%3D%2Fhome%26x%3D1"
        );
    }

    #[test]
    fn test_location_relative_to_directory() {
        let target = Url::parse("https://site.com/docs/intro").unwrap();
        assert_eq!(
            rewrite_location("next", &target, "http://p.io:8080").unwrap(),
            "http://p.io:8080/https%3A%2F%2Fsite.com%2Fdocs%2Fnext"
        );
    }

    #[test]
    fn test_location_unreserved_characters_kept() {
        let target = Url::parse("https://site.com/").unwrap();
        assert_eq!(
            rewrite_location("/a-b_c.d~e", &target, "https://p.io").unwrap(),
            "https://p.io/https%3A%2F%2Fsite.com%2Fa-b_c.d~e"
        );
    }

    #[test]
    fn test_location_protocol_relative() {
        let target = Url::parse("https://site.com/").unwrap();
        assert_eq!(
            rewrite_location("//cdn.site.com/x", &target, "https://p.io").unwrap(),
            "https://p.io/https%3A%2F%2Fcdn.site.com%2Fx"
        );
    }

    #[test]
    fn test_redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            assert!(is_redirect(status));
        }
        for status in [200, 300, 304, 305, 404] {
            assert!(!is_redirect(status));
        }
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html"));
        assert!(is_html("text/html; charset=utf-8"));
        assert!(is_html("Text/HTML"));
        assert!(!is_html("application/json"));
        assert!(!is_html(""));
    }
}
