//! HTTP request handling and proxying.
//!
//! This module contains the control flow of the gateway. Each request walks
//! the pipeline below and stops at the first terminal step:
//!
//! 1. `/health` - always answered, before auth and rate limiting
//! 2. Shared-secret authentication (401)
//! 3. Per-client rate limiting (429)
//! 4. CORS preflight (204)
//! 5. Landing page at `/` (200)
//! 6. `CONNECT` rejection (501)
//! 7. Target extraction, parsing and safety check (400 / 403)
//! 8. Dispatch through the [`Transport`] (502 on failure)
//! 9. Redirect or HTML rewriting, otherwise passthrough
//!
//! Every response, including errors, carries the CORS header set. A panic
//! anywhere in the pipeline is answered with a 500 JSON error.

use std::any::Any;
use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::HeaderValue;
use hyper::{HeaderMap, Method, Request, Response};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{ProxyError, Result};
use crate::headers;
use crate::rate_limiter::check_rate_limit;
use crate::transport::{CacheHint, OutboundRequest, Transport, UpstreamResponse};
use crate::types::{ConfigProvider, RateLimiter};
use crate::url_safety::SafetyVerdict;
use crate::{auth, client_ip, landing, response, rewrite, sanitize, target, url_safety};

/// Everything a request needs, shared by all connections.
pub struct ProxyState<C, T> {
    pub config: Arc<C>,
    pub limiter: RateLimiter,
    pub transport: Arc<T>,
    /// Authority used for the gateway's own origin when a request carries
    /// no `Host` header, normally the listen address.
    pub fallback_authority: Arc<str>,
}

impl<C, T> ProxyState<C, T> {
    /// Creates state with a fresh rate limiter.
    pub fn new(config: Arc<C>, transport: Arc<T>, fallback_authority: &str) -> Self {
        Self {
            config,
            limiter: RateLimiter::new(),
            transport,
            fallback_authority: Arc::from(fallback_authority),
        }
    }
}

impl<C, T> Clone for ProxyState<C, T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            limiter: self.limiter.clone(),
            transport: Arc::clone(&self.transport),
            fallback_authority: Arc::clone(&self.fallback_authority),
        }
    }
}

/// Handles an incoming HTTP request through the proxy pipeline.
///
/// # Arguments
///
/// * `req` - The incoming HTTP request
/// * `peer` - Address of the TCP peer, the default rate-limit key
/// * `state` - Shared configuration, limiter and transport
///
/// # Returns
///
/// Always returns `Ok`: pipeline errors are rendered as JSON responses.
pub async fn handle_request<B, C, T>(
    req: Request<B>,
    peer: SocketAddr,
    state: ProxyState<C, T>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
    C: ConfigProvider,
    T: Transport,
{
    let config = state.config.as_ref();
    let origin = target::proxy_origin(
        config.proxy_config().public_origin.as_deref(),
        req.uri(),
        req.headers(),
        &state.fallback_authority,
    );

    let outcome = AssertUnwindSafe(process(req, peer, &state, &origin))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(ProxyError::Internal(panic_message(panic.as_ref()))));

    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            if err.is_server_error() {
                error!(error = %err, "Request failed");
            } else {
                debug!(error = %err, "Request rejected");
            }
            response::error_response(&err, config.version(), &origin)
        }
    };

    Ok(response::with_cors(response))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string payload".to_string());
    format!("request handler panicked: {detail}")
}

async fn process<B, C, T>(
    req: Request<B>,
    peer: SocketAddr,
    state: &ProxyState<C, T>,
    origin: &str,
) -> Result<Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
    C: ConfigProvider,
    T: Transport,
{
    let config = state.config.as_ref();

    if req.uri().path() == "/health" {
        return Ok(response::health_response(config.version()));
    }

    if config.is_auth_enabled() {
        auth::check_api_key(req.headers(), config)?;
    } else {
        debug!("No shared secret configured, request not authenticated");
    }

    let rate_config = config.rate_limit_config();
    if rate_config.enabled {
        let client = client_ip::client_id(req.headers(), peer, config.trusted_proxy_ips());
        if !check_rate_limit(&state.limiter, &client, config).await {
            warn!(client = %client, "Rate limit exceeded");
            return Err(ProxyError::RateLimited {
                max_requests: rate_config.max_requests,
                window_secs: rate_config.window_duration.as_secs(),
            });
        }
    }

    if req.method() == Method::OPTIONS {
        return Ok(response::preflight_response());
    }

    // Authority-form targets (CONNECT) have an empty path and fall through.
    if req.uri().path() == "/" {
        return Ok(response::html_response(landing::landing_page(
            config.version(),
        )));
    }

    if req.method() == Method::CONNECT {
        return Err(ProxyError::UnsupportedMethod(Method::CONNECT.to_string()));
    }

    let inbound = target::inbound_url(req.uri(), origin)?;
    let raw_target = target::extract_target(req.headers(), &inbound).ok_or(ProxyError::MissingTarget)?;

    let target_url = Url::parse(&raw_target).map_err(|e| ProxyError::MalformedTarget {
        url: raw_target.clone(),
        reason: e.to_string(),
    })?;

    if let SafetyVerdict::Unsafe { reason } = url_safety::check(&raw_target, config.blocked_hosts()) {
        warn!(target = %raw_target, reason = %reason, "Blocked target");
        return Err(ProxyError::UnsafeTarget {
            url: raw_target,
            reason,
        });
    }

    let outbound = build_outbound(req, target_url, config).await?;
    let method = outbound.method.clone();
    let target_url = outbound.url.clone();

    info!(method = %method, target = %target_url, "Proxying request");
    let upstream = state.transport.send(outbound).await?;

    finish(upstream, &target_url, origin)
}

/// Turns the inbound request into the upstream request: sanitized headers,
/// body only for methods that carry one, cache hint for GET.
async fn build_outbound<B, C>(req: Request<B>, url: Url, config: &C) -> Result<OutboundRequest>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
    C: ConfigProvider,
{
    let (parts, body) = req.into_parts();

    let mut outbound_headers = sanitize::clean_headers(&parts.headers, config.removed_headers());
    outbound_headers.remove(headers::HOST);
    outbound_headers.remove(headers::CONTENT_LENGTH);
    // The client negotiates its own encodings so it can always decode the body.
    outbound_headers.remove(hyper::header::ACCEPT_ENCODING);
    // The shared secret never leaves the gateway, whatever the removal list says.
    outbound_headers.remove(config.api_key_header());
    headers::strip_hop_by_hop(&mut outbound_headers);

    let body = if matches!(parts.method, Method::GET | Method::HEAD) {
        None
    } else {
        Some(read_body(&parts.headers, body, config.proxy_config().max_body_size).await?)
    };

    let cache_config = config.cache_config();
    let cache = (cache_config.enabled && parts.method == Method::GET).then(|| CacheHint {
        ttl: cache_config.ttl,
        key: url.to_string(),
        cache_everything: cache_config.cache_everything,
    });

    Ok(OutboundRequest {
        method: parts.method,
        url,
        headers: outbound_headers,
        body,
        cache,
    })
}

/// Collects the inbound body, enforcing `max_size` (0 = unlimited).
async fn read_body<B>(headers: &HeaderMap, body: B, max_size: usize) -> Result<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    // Reject early when the declared length is already too large
    if max_size > 0
        && let Some(declared) = headers
            .get(headers::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
        && declared > max_size
    {
        return Err(ProxyError::BodyTooLarge {
            size: declared,
            max: max_size,
        });
    }

    let bytes = body
        .collect()
        .await
        .map_err(|e| ProxyError::BodyRead(e.to_string()))?
        .to_bytes();

    if max_size > 0 && bytes.len() > max_size {
        return Err(ProxyError::BodyTooLarge {
            size: bytes.len(),
            max: max_size,
        });
    }

    Ok(bytes)
}

/// Applies redirect or HTML rewriting to an upstream response.
fn finish(upstream: UpstreamResponse, target_url: &Url, origin: &str) -> Result<Response<Full<Bytes>>> {
    let location = upstream
        .headers
        .get(headers::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if rewrite::is_redirect(upstream.status.as_u16())
        && let Some(location) = location
    {
        let rewritten = rewrite::rewrite_location(&location, target_url, origin)?;
        let location_value = HeaderValue::from_str(&rewritten)
            .map_err(|e| ProxyError::Internal(format!("unencodable location: {e}")))?;

        let mut response = response::from_upstream(upstream);
        response.headers_mut().insert(headers::LOCATION, location_value);
        headers::apply(response.headers_mut(), headers::NO_CACHE_HEADERS);
        debug!(from = %location, to = %rewritten, "Rewrote redirect");
        return Ok(response);
    }

    let is_html = upstream
        .headers
        .get(headers::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(rewrite::is_html);

    if is_html {
        let body = rewrite::rewrite_html(&upstream.body, origin, target_url);
        let mut response = response::from_upstream(UpstreamResponse {
            body: Bytes::from(body),
            ..upstream
        });
        response.headers_mut().remove(headers::CONTENT_LENGTH);
        headers::apply(response.headers_mut(), headers::NO_CACHE_HEADERS);
        return Ok(response);
    }

    Ok(response::from_upstream(upstream))
}
