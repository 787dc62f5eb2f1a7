//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (while a site binds):
//!     gateway pattern (RouteRegistry)
//!     → pattern.rs (validate, rewrite to local dialect)
//!     → router.rs (insert per verb, detect conflicts)
//!     → Freeze as immutable SiteRouter
//!
//! Incoming Request (path, verb)
//!     → router.rs (radix lookup)
//!     → matcher.rs (regex constraints, when allowed)
//!     → Return: binding + parameters, or NotFound / MethodNotAllowed
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Handlers always see the gateway pattern, never the local one
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod pattern;
pub mod router;

pub use pattern::{translate, PatternError, TranslatedPattern};
pub use router::{Binding, RouteConflict, RouteInfo, RouteMatch, RouteMiss, SiteRouter};
