//! In-flight request tracking for graceful drain.
//!
//! # Responsibilities
//! - Count requests currently inside a handler call
//! - Let the drain phase wait until that count reaches zero

use std::sync::Arc;
use tokio::sync::watch;

/// Tracks in-flight requests of one site server.
///
/// The count is published on a watch channel so waiters wake on change
/// instead of polling.
#[derive(Debug, Clone)]
pub struct InFlightTracker {
    active: Arc<watch::Sender<u64>>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            active: Arc::new(tx),
        }
    }

    /// Record a new in-flight request. Returns a guard that decrements on drop.
    pub fn track(&self) -> RequestGuard {
        self.active.send_modify(|n| *n += 1);
        RequestGuard {
            active: Arc::clone(&self.active),
        }
    }

    pub fn active_count(&self) -> u64 {
        *self.active.borrow()
    }

    /// Wait until no request is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.active.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for InFlightTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard held for the duration of one request.
#[derive(Debug)]
pub struct RequestGuard {
    active: Arc<watch::Sender<u64>>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.active.send_modify(|n| *n -= 1);
        tracing::trace!(in_flight = *self.active.borrow(), "Request finished");
    }
}
