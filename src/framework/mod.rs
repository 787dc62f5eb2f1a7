//! Handler framework: the pieces handler authors program against.
//!
//! # Data Flow
//! ```text
//! handler type ──register──▶ RouteRegistry (HandlerId → patterns)
//!      │
//!      └─ FromConfig(Arc<GlobalConfig>) ──▶ Arc<dyn Handler>
//!
//! per request:
//!     InvocationEvent + InvocationContext ──▶ Handler::call ──▶ InvocationResult
//! ```

pub mod event;
pub mod global_config;
pub mod handler;
pub mod registry;

pub use event::{Identity, InvocationContext, InvocationEvent, InvocationResult, RequestContext};
pub use global_config::{ConfigurationConflict, GlobalConfig};
pub use handler::{
    factory_for, FromConfig, Handler, HandlerError, HandlerFactory, HandlerId, HandlerResult, Verb,
};
pub use registry::RouteRegistry;
