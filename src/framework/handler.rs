//! Handler capability interface.
//!
//! A handler is the unit of request processing. It declares which HTTP verbs
//! it answers through [`Handler::verbs`]; the site server binds a route only
//! for the verbs listed there, so an unlisted verb never reaches
//! [`Handler::call`].

use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use crate::framework::event::{InvocationContext, InvocationEvent, InvocationResult};
use crate::framework::global_config::GlobalConfig;

/// Error raised by a handler operation.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a handler operation. `Ok(None)` is an empty response.
pub type HandlerResult = Result<Option<InvocationResult>, HandlerError>;

/// HTTP verbs a handler may expose, in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
}

impl Verb {
    /// Every verb, in the order routes are bound.
    pub const ALL: [Verb; 9] = [
        Verb::Get,
        Verb::Head,
        Verb::Post,
        Verb::Put,
        Verb::Delete,
        Verb::Connect,
        Verb::Options,
        Verb::Trace,
        Verb::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Head => "HEAD",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Connect => "CONNECT",
            Verb::Options => "OPTIONS",
            Verb::Trace => "TRACE",
            Verb::Patch => "PATCH",
        }
    }

    /// Map a wire method onto a verb. Extension methods have no verb.
    pub fn from_method(method: &Method) -> Option<Self> {
        Verb::ALL.into_iter().find(|v| v.as_str() == method.as_str())
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a handler implementation, used as the route registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(&'static str);

impl HandlerId {
    /// Identity of the handler type `H`.
    pub fn of<H: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<H>())
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A unit of request processing.
///
/// Implementations are shared across concurrent requests. Any state they hold
/// must provide its own synchronization.
pub trait Handler: Send + Sync + 'static {
    /// Verbs this handler answers. Duplicates are ignored.
    fn verbs(&self) -> &[Verb];

    /// Run the operation for `verb`.
    fn call(
        &self,
        verb: Verb,
        event: &InvocationEvent,
        context: Option<&InvocationContext>,
    ) -> HandlerResult;

    /// Route registry key for this handler.
    fn id(&self) -> HandlerId {
        HandlerId::of::<Self>()
    }
}

/// Construction from the shared run configuration.
pub trait FromConfig {
    fn from_config(config: Arc<GlobalConfig>) -> Self;
}

/// Builds a handler instance for one site server.
pub type HandlerFactory = Arc<dyn Fn(Arc<GlobalConfig>) -> Arc<dyn Handler> + Send + Sync>;

/// Factory for a handler type constructed via [`FromConfig`].
pub fn factory_for<H>() -> HandlerFactory
where
    H: Handler + FromConfig,
{
    Arc::new(|config| Arc::new(H::from_config(config)) as Arc<dyn Handler>)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Handler for Noop {
        fn verbs(&self) -> &[Verb] {
            &[]
        }

        fn call(&self, _: Verb, _: &InvocationEvent, _: Option<&InvocationContext>) -> HandlerResult {
            Ok(None)
        }
    }

    #[test]
    fn verb_from_method() {
        assert_eq!(Verb::from_method(&Method::GET), Some(Verb::Get));
        assert_eq!(Verb::from_method(&Method::PATCH), Some(Verb::Patch));
        let custom = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(Verb::from_method(&custom), None);
    }

    #[test]
    fn dyn_handler_reports_concrete_identity() {
        let handler: Arc<dyn Handler> = Arc::new(Noop);
        assert_eq!(handler.id(), HandlerId::of::<Noop>());
        assert!(handler.id().as_str().ends_with("Noop"));
    }
}
