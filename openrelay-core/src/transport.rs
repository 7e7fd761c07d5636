//! Outbound HTTP transport.
//!
//! The orchestrator never talks to the network directly: it hands an
//! [`OutboundRequest`] to a [`Transport`]. [`HttpTransport`] is the
//! production implementation on top of a pooled `reqwest::Client` that
//! never follows redirects, so the gateway can rewrite `Location` headers
//! itself. Tests substitute a stub.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use hyper::header::HeaderValue;
use hyper::{HeaderMap, Method, StatusCode};
use tracing::debug;
use url::Url;

use crate::cache::{self, ResponseCache};
use crate::error::{ProxyError, Result};
use crate::headers;
use crate::types::{CacheConfig, ProxyConfig};

/// Caching instructions attached to a cacheable dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheHint {
    /// How long a stored response stays fresh.
    pub ttl: Duration,
    /// Key the response is stored under; the canonical target URL.
    pub key: String,
    /// Store regardless of content type and upstream cache directives.
    pub cache_everything: bool,
}

/// A fully prepared upstream request.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    /// Already sanitized; sent as-is.
    pub headers: HeaderMap,
    /// `None` for GET and HEAD.
    pub body: Option<Bytes>,
    pub cache: Option<CacheHint>,
}

/// A fully buffered upstream response.
#[derive(Clone, Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Something that can dispatch an [`OutboundRequest`].
///
/// Implementations must not follow redirects.
pub trait Transport: Send + Sync + 'static {
    /// Sends `request` and buffers the whole response.
    ///
    /// # Errors
    ///
    /// Connection, TLS and timeout failures are reported as
    /// [`ProxyError::UpstreamDispatch`].
    fn send(&self, request: OutboundRequest)
    -> impl Future<Output = Result<UpstreamResponse>> + Send;
}

/// Production transport: pooled `reqwest` client plus response cache.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    cache: ResponseCache,
}

impl HttpTransport {
    /// Builds the HTTP client with the configured timeout and redirects disabled.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Internal`] if the TLS backend cannot be initialized.
    pub fn new(proxy: &ProxyConfig, cache: &CacheConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(proxy.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            cache: ResponseCache::new(cache.max_entries),
        })
    }

    /// Returns the response cache shared by all clones of this transport.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    async fn dispatch(&self, request: OutboundRequest) -> Result<UpstreamResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse> {
        let hint = request.cache.clone();
        if hint.is_some() && cache::carries_credentials(&request.headers) {
            debug!(url = %request.url, "Credentialed request, bypassing cache");
            return self.dispatch(request).await;
        }

        if let Some(hint) = &hint
            && let Some(mut hit) = self.cache.get(&hint.key).await
        {
            debug!(key = %hint.key, "Serving response from cache");
            hit.headers
                .insert(headers::X_PROXY_CACHE, HeaderValue::from_static("HIT"));
            return Ok(hit);
        }

        let response = self.dispatch(request).await?;

        if let Some(hint) = hint
            && cache::is_cacheable(&response, hint.cache_everything)
        {
            debug!(key = %hint.key, ttl_secs = hint.ttl.as_secs(), "Caching response");
            self.cache.put(hint.key, response.clone(), hint.ttl).await;
        }

        Ok(response)
    }
}
