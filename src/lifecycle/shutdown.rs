//! Shutdown coordination for site servers.

use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::ShutdownConfig;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that every site server subscribes to.
#[derive(Debug, Clone)]
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of servers still listening for the signal.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Time budgets applied, in order, while a site drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainBudget {
    /// How long in-flight handler calls may take to finish.
    pub request_grace: Duration,
    /// How long remaining connections get to close before being dropped.
    pub connection_grace: Duration,
}

impl From<&ShutdownConfig> for DrainBudget {
    fn from(config: &ShutdownConfig) -> Self {
        Self {
            request_grace: Duration::from_secs(config.request_grace_secs),
            connection_grace: Duration::from_secs(config.connection_grace_secs),
        }
    }
}

impl Default for DrainBudget {
    fn default() -> Self {
        Self::from(&ShutdownConfig::default())
    }
}
