//! Error types for OpenRelay.
//!
//! Every way a proxied request can fail maps to one [`ProxyError`] variant,
//! which knows its HTTP status and how it is presented to the caller.

use hyper::StatusCode;
use thiserror::Error;

/// Result type alias for OpenRelay operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Unified error type for the proxy pipeline.
///
/// # Example
///
/// ```
/// use openrelay_core::error::{ProxyError, Result};
///
/// fn require_target(target: Option<String>) -> Result<String> {
///     target.ok_or(ProxyError::MissingTarget)
/// }
///
/// assert!(require_target(None).is_err());
/// ```
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Shared-secret header missing or wrong.
    #[error("{0}")]
    Unauthorized(String),

    /// Client exceeded its request budget for the current window.
    #[error("Rate limit exceeded: maximum {max_requests} requests per {window_secs} seconds")]
    RateLimited {
        /// Requests allowed per window.
        max_requests: u32,
        /// Window length, also sent as `Retry-After`.
        window_secs: u64,
    },

    /// Method the gateway refuses to proxy (CONNECT).
    #[error("{0} method not supported")]
    UnsupportedMethod(String),

    /// No target URL could be derived from the request.
    #[error("No target URL provided")]
    MissingTarget,

    /// The derived target does not parse as a URL.
    #[error("Invalid target URL: {url}")]
    MalformedTarget {
        /// The rejected input, echoed back.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The target was rejected by the URL safety filter.
    #[error("URL blocked: {reason}")]
    UnsafeTarget {
        /// The rejected target.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Inbound request body exceeds the configured limit.
    #[error("Request body too large: {size} bytes (max: {max} bytes)")]
    BodyTooLarge {
        /// Actual body size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// The inbound request itself is unusable (e.g. a malformed `Host`).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Failed to read the inbound request body.
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// Upstream answered with something the gateway cannot relay.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The outbound call itself failed (connect, TLS, timeout, body read).
    #[error("Upstream dispatch failed: {0}")]
    UpstreamDispatch(#[from] reqwest::Error),

    /// Anything else; never expected in normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Returns the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UnsupportedMethod(_) => StatusCode::NOT_IMPLEMENTED,
            Self::MissingTarget => StatusCode::BAD_REQUEST,
            Self::MalformedTarget { .. } => StatusCode::BAD_REQUEST,
            Self::UnsafeTarget { .. } => StatusCode::FORBIDDEN,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidRequest(_) | Self::BodyRead(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamDispatch(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short title placed in the `error` field of the JSON body.
    pub fn title(&self) -> String {
        match self {
            Self::Unauthorized(message) => message.clone(),
            Self::RateLimited { .. } => "Rate limit exceeded".to_string(),
            Self::UnsupportedMethod(method) => format!("{method} method not supported"),
            Self::MissingTarget => "No target URL provided".to_string(),
            Self::MalformedTarget { .. } => "Invalid target URL".to_string(),
            Self::UnsafeTarget { .. } => "URL blocked".to_string(),
            Self::BodyTooLarge { .. } => "Request body too large".to_string(),
            Self::InvalidRequest(_) | Self::BodyRead(_) => "Bad request".to_string(),
            Self::Upstream(_) | Self::UpstreamDispatch(_) => "Upstream request failed".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Optional human-readable detail placed in the `message` field.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::RateLimited {
                max_requests,
                window_secs,
            } => Some(format!(
                "Maximum {max_requests} requests per {window_secs} seconds"
            )),
            Self::UnsupportedMethod(_) => Some("Please use standard HTTP proxy mode".to_string()),
            Self::MalformedTarget { reason, .. } => Some(reason.clone()),
            Self::BodyTooLarge { size, max } => {
                Some(format!("{size} bytes received, at most {max} accepted"))
            }
            Self::InvalidRequest(reason) | Self::BodyRead(reason) | Self::Upstream(reason) => {
                Some(reason.clone())
            }
            Self::UpstreamDispatch(err) => Some(err.to_string()),
            // Internal details stay in the logs.
            _ => None,
        }
    }

    /// Value of the `Retry-After` header, if any.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { window_secs, .. } => Some(*window_secs),
            _ => None,
        }
    }

    /// Returns true if this error should be logged at error level.
    ///
    /// Client mistakes and policy rejections are expected and only warrant
    /// debug or warn level logging.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Upstream(_) | Self::UpstreamDispatch(_) | Self::Internal(_)
        )
    }
}
