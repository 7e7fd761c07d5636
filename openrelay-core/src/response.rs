//! Response construction.
//!
//! Builders for every response the gateway produces itself (health, CORS
//! preflight, landing page, JSON errors) plus conversion of buffered
//! upstream responses into hyper responses.

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use http_body_util::Full;
use hyper::header::HeaderValue;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::error::ProxyError;
use crate::headers;
use crate::transport::UpstreamResponse;

/// Current UTC time as RFC 3339 with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serializes `body` as pretty-printed JSON.
///
/// Falls back to a bare 500 if serialization fails (never expected for the
/// bodies built in this crate).
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec_pretty(body) {
        Ok(json) => Response::builder()
            .status(status)
            .header(headers::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(json)))
            .unwrap_or_else(|_| fallback_response()),
        Err(_) => fallback_response(),
    }
}

fn fallback_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

#[derive(Serialize)]
struct Health<'a> {
    status: &'static str,
    version: &'a str,
    timestamp: String,
}

/// `200 {"status":"healthy","version":..,"timestamp":..}`
pub fn health_response(version: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &Health {
            status: "healthy",
            version,
            timestamp: timestamp(),
        },
    )
}

/// Empty `204` answering a CORS preflight.
pub fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

/// `200 text/html; charset=utf-8` with the given document.
pub fn html_response(html: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(html)));
    response.headers_mut().insert(
        headers::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

#[derive(Serialize)]
struct Usage {
    web: &'static str,
    method1: &'static str,
    method2: &'static str,
    method3: &'static str,
}

const USAGE: Usage = Usage {
    web: "Visit / for Web UI",
    method1: "?url=https://example.com",
    method2: "/https://example.com or /example.com",
    method3: "Set as HTTP_PROXY in environment",
};

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provided: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<&'a Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    documentation: Option<&'a str>,
    status: u16,
    timestamp: String,
    version: &'a str,
}

/// Renders a [`ProxyError`] as a JSON response.
///
/// `proxy_origin` is linked as documentation when no target was given.
/// Rate-limit errors also carry `Retry-After`.
///
/// # Example
///
/// ```
/// use hyper::StatusCode;
/// use openrelay_core::error::ProxyError;
/// use openrelay_core::response::error_response;
///
/// let response = error_response(&ProxyError::MissingTarget, "2.0.0", "https://p.io");
/// assert_eq!(response.status(), StatusCode::BAD_REQUEST);
/// ```
pub fn error_response(err: &ProxyError, version: &str, proxy_origin: &str) -> Response<Full<Bytes>> {
    let status = err.status_code();
    let mut body = ErrorBody {
        error: err.title(),
        message: err.message(),
        reason: None,
        url: None,
        provided: None,
        usage: None,
        documentation: None,
        status: status.as_u16(),
        timestamp: timestamp(),
        version,
    };

    match err {
        ProxyError::MissingTarget => {
            body.usage = Some(&USAGE);
            body.documentation = Some(proxy_origin);
        }
        ProxyError::MalformedTarget { url, .. } => body.provided = Some(url.as_str()),
        ProxyError::UnsafeTarget { url, reason } => {
            body.reason = Some(reason.as_str());
            body.url = Some(url.as_str());
        }
        _ => {}
    }

    let mut response = json_response(status, &body);
    if let Some(secs) = err.retry_after() {
        response
            .headers_mut()
            .insert(headers::RETRY_AFTER, HeaderValue::from(secs));
    }
    response
}

/// Converts a buffered upstream response, dropping hop-by-hop headers.
pub fn from_upstream(upstream: UpstreamResponse) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(upstream.body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = upstream.headers;
    headers::strip_hop_by_hop(response.headers_mut());
    response
}

/// Adds the permissive CORS header set.
pub fn with_cors(mut response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    headers::apply(response.headers_mut(), headers::CORS_HEADERS);
    response
}
