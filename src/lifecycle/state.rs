//! Site server lifecycle states.

use std::fmt;

use tokio::sync::watch;

/// Lifecycle of one site group's server.
///
/// ```text
/// Unstarted → Binding → Serving → Draining → Stopped
///                │
///                └──────→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteState {
    Unstarted,
    /// Discovering handlers, building the router, binding the socket.
    Binding,
    Serving,
    /// No longer accepting; finishing in-flight work.
    Draining,
    Stopped,
    /// Startup aborted for this group.
    Failed,
}

impl SiteState {
    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_advance_to(self, next: SiteState) -> bool {
        matches!(
            (self, next),
            (SiteState::Unstarted, SiteState::Binding)
                | (SiteState::Binding, SiteState::Serving)
                | (SiteState::Binding, SiteState::Failed)
                | (SiteState::Serving, SiteState::Draining)
                | (SiteState::Draining, SiteState::Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SiteState::Stopped | SiteState::Failed)
    }
}

impl fmt::Display for SiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SiteState::Unstarted => "unstarted",
            SiteState::Binding => "binding",
            SiteState::Serving => "serving",
            SiteState::Draining => "draining",
            SiteState::Stopped => "stopped",
            SiteState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Publish `next` on a group's state channel.
pub fn advance(state: &watch::Sender<SiteState>, group: &str, next: SiteState) {
    let current = *state.borrow();
    if !current.can_advance_to(next) {
        tracing::warn!(site_group = %group, from = %current, to = %next, "Unexpected state transition");
    }
    state.send_replace(next);
    tracing::debug!(site_group = %group, from = %current, to = %next, "Site state changed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions() {
        assert!(SiteState::Unstarted.can_advance_to(SiteState::Binding));
        assert!(SiteState::Binding.can_advance_to(SiteState::Failed));
        assert!(SiteState::Draining.can_advance_to(SiteState::Stopped));
        assert!(!SiteState::Unstarted.can_advance_to(SiteState::Serving));
        assert!(!SiteState::Stopped.can_advance_to(SiteState::Serving));
        assert!(SiteState::Failed.is_terminal());
    }

    #[test]
    fn advance_publishes_to_watchers() {
        let (tx, mut rx) = watch::channel(SiteState::Unstarted);
        advance(&tx, "shop", SiteState::Binding);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SiteState::Binding);
        advance(&tx, "shop", SiteState::Failed);
        assert_eq!(*rx.borrow(), SiteState::Failed);
    }
}
