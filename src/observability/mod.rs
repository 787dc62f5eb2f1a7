//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing macros with structured fields (site_group, handler, request_id)
//!     → tower_http TraceLayer spans per request
//!
//! Consumers:
//!     → logging.rs subscriber (stdout)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows from the dispatcher into handler context
//! - One subscriber per process, installed by the binary

pub mod logging;

pub use logging::LogFormat;
