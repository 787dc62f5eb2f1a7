//! Handler discovery.
//!
//! # Data Flow
//! ```text
//! site group name
//!     → Discovery::discover
//!     → entry_points.rs (run loaders, downcast to HandlerFactory)
//!     → ordered [(handler name, factory)]
//! ```
//!
//! Any load failure aborts discovery for the whole group: a site must not
//! come up with part of its handlers missing.

pub mod entry_points;

use std::sync::Arc;

use thiserror::Error;

use crate::framework::{factory_for, FromConfig, Handler, HandlerFactory};

pub use entry_points::{EntryPoints, Loaded, Loader};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The entry's loader failed.
    #[error("failed to load entry point `{name}` from `{group}`: {reason}")]
    Load {
        group: String,
        name: String,
        reason: String,
    },

    /// The entry loaded but is not of the required kind.
    #[error("entry point `{name}` from `{group}` does not satisfy `{expected}`")]
    TypeConstraintViolation {
        group: String,
        name: String,
        expected: &'static str,
    },
}

/// Source of the handlers that make up a site group.
pub trait Discovery: Send + Sync {
    /// Ordered `(handler name, factory)` pairs registered under `group`.
    fn discover(&self, group: &str) -> Result<Vec<(String, HandlerFactory)>, DiscoveryError>;
}

impl Discovery for EntryPoints {
    fn discover(&self, group: &str) -> Result<Vec<(String, HandlerFactory)>, DiscoveryError> {
        let handlers = self.load::<HandlerFactory>(group)?;
        if handlers.is_empty() {
            tracing::warn!(site_group = %group, "No handlers registered for site group");
        }
        Ok(handlers)
    }
}

impl EntryPoints {
    /// Register handler type `H` under `group` as `name`.
    pub fn register_handler<H>(&mut self, group: impl Into<String>, name: impl Into<String>) -> &mut Self
    where
        H: Handler + FromConfig,
    {
        self.register(group, name, factory_for::<H>())
    }
}

impl<D: Discovery + ?Sized> Discovery for Arc<D> {
    fn discover(&self, group: &str) -> Result<Vec<(String, HandlerFactory)>, DiscoveryError> {
        (**self).discover(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{
        GlobalConfig, HandlerId, HandlerResult, InvocationContext, InvocationEvent, Verb,
    };

    struct Ping;

    impl FromConfig for Ping {
        fn from_config(_: Arc<GlobalConfig>) -> Self {
            Ping
        }
    }

    impl Handler for Ping {
        fn verbs(&self) -> &[Verb] {
            &[Verb::Post]
        }

        fn call(&self, _: Verb, _: &InvocationEvent, _: Option<&InvocationContext>) -> HandlerResult {
            Ok(None)
        }
    }

    #[test]
    fn discovers_registered_handlers() {
        let mut eps = EntryPoints::new();
        eps.register_handler::<Ping>("site", "ping");

        let found = eps.discover("site").unwrap();
        assert_eq!(found.len(), 1);
        let (name, factory) = &found[0];
        assert_eq!(name, "ping");

        let handler = factory(Arc::new(GlobalConfig::new()));
        assert_eq!(handler.id(), HandlerId::of::<Ping>());
        assert_eq!(handler.verbs(), [Verb::Post]);
    }

    #[test]
    fn non_handler_entry_violates_type_constraint() {
        let mut eps = EntryPoints::new();
        eps.register_handler::<Ping>("site", "ping");
        eps.register("site", "stray", 42u8);

        match eps.discover("site") {
            Err(DiscoveryError::TypeConstraintViolation { group, name, .. }) => {
                assert_eq!(group, "site");
                assert_eq!(name, "stray");
            }
            other => panic!("unexpected discovery result: {:?}", other.map(|v| v.len())),
        }
    }
}
