//! Connection limiting for OpenRelay.
//!
//! Caps the number of concurrently served TCP connections with a semaphore.
//! Connections over the limit are dropped right after `accept`, before any
//! HTTP parsing happens.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Outcome of asking the limiter for room for one more connection.
#[derive(Debug)]
pub enum Admission {
    /// No limit is configured.
    Unlimited,
    /// Within the limit; the slot is released when the permit is dropped.
    Admitted(OwnedSemaphorePermit),
    /// At capacity.
    Rejected,
}

impl Admission {
    /// Returns `true` unless the connection must be refused.
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Admission::Rejected)
    }
}

/// Semaphore-backed limit on concurrent connections.
#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    semaphore: Option<Arc<Semaphore>>,
    max_connections: usize,
}

impl ConnectionLimiter {
    /// Create a new connection limiter.
    /// If max_connections is 0, no limit is enforced.
    pub fn new(max_connections: usize) -> Self {
        let semaphore = (max_connections > 0).then(|| Arc::new(Semaphore::new(max_connections)));

        Self {
            semaphore,
            max_connections,
        }
    }

    /// Check if connection limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.semaphore.is_some()
    }

    /// Get the maximum number of connections (0 means unlimited).
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Try to make room for one more connection without waiting.
    pub fn admit(&self) -> Admission {
        match &self.semaphore {
            None => Admission::Unlimited,
            Some(sem) => match sem.clone().try_acquire_owned() {
                Ok(permit) => Admission::Admitted(permit),
                Err(_) => Admission::Rejected,
            },
        }
    }

    /// Number of connections currently holding a slot.
    pub fn active(&self) -> usize {
        self.semaphore
            .as_ref()
            .map_or(0, |sem| self.max_connections - sem.available_permits())
    }
}
