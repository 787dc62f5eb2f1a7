//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! site group + assigned port
//!     → listener.rs (bind, derive endpoint URL)
//!     → Hand off to HTTP layer (http::server accept loop)
//!     → connection.rs (in-flight tracking per request)
//! ```
//!
//! # Design Decisions
//! - One listener per site group; groups never share a socket
//! - In-flight count drives the first drain budget on shutdown

pub mod connection;
pub mod listener;
