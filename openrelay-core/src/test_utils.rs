//! Test utilities for OpenRelay.
//!
//! Provides a [`Transport`] stub that records every outbound request and
//! answers with a canned response, so the orchestrator can be tested
//! without a network. Only compiled when running tests (`#[cfg(test)]`).

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, StatusCode};

use crate::error::{ProxyError, Result};
use crate::transport::{OutboundRequest, Transport, UpstreamResponse};

#[derive(Clone)]
enum Reply {
    Respond(UpstreamResponse),
    Fail(String),
    Panic(String),
}

/// Recording transport stub.
///
/// Clones share the recorded requests.
#[derive(Clone)]
pub struct StubTransport {
    reply: Reply,
    requests: Arc<Mutex<Vec<OutboundRequest>>>,
}

impl StubTransport {
    /// Answers every request with `status`, `headers` and `body`.
    pub fn new(status: StatusCode, headers: &[(&'static str, &'static str)], body: &str) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }

        Self::with_reply(Reply::Respond(UpstreamResponse {
            status,
            headers: map,
            body: Bytes::from(body.to_string()),
        }))
    }

    /// Answers `200 OK` with a plain-text body.
    pub fn ok(body: &str) -> Self {
        Self::new(StatusCode::OK, &[("content-type", "text/plain")], body)
    }

    /// Fails every request as an unreachable upstream would.
    pub fn failing(message: &str) -> Self {
        Self::with_reply(Reply::Fail(message.to_string()))
    }

    /// Panics on every request, like a bug deep in the pipeline would.
    pub fn panicking(message: &str) -> Self {
        Self::with_reply(Reply::Panic(message.to_string()))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            requests: Arc::default(),
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for StubTransport {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse> {
        self.requests.lock().unwrap().push(request);

        match &self.reply {
            Reply::Respond(response) => Ok(response.clone()),
            Reply::Fail(message) => Err(ProxyError::Upstream(message.clone())),
            Reply::Panic(message) => panic!("{message}"),
        }
    }
}
