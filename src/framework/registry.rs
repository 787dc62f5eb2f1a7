//! Route registry: handler identity → declared path patterns.
//!
//! Built once before any site server starts, then shared behind an `Arc`
//! and only read while serving.

use std::collections::HashMap;

use crate::framework::handler::HandlerId;

#[derive(Debug, Default, Clone)]
pub struct RouteRegistry {
    routes: HashMap<HandlerId, Vec<String>>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare routes for handler type `H`.
    pub fn register<H: ?Sized + 'static, I, S>(&mut self, patterns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register_id(HandlerId::of::<H>(), patterns)
    }

    /// Append patterns not yet known for `id`, keeping first-seen order.
    pub fn register_id<I, S>(&mut self, id: HandlerId, patterns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.routes.entry(id).or_default();
        for pattern in patterns {
            let pattern = pattern.into();
            if entry.contains(&pattern) {
                tracing::warn!(handler = %id, pattern = %pattern, "Route already registered, ignoring");
                continue;
            }
            entry.push(pattern);
        }
        self
    }

    /// Patterns declared for `id`; empty when none were registered.
    pub fn lookup(&self, id: HandlerId) -> &[String] {
        self.routes.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
