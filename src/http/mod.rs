//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, hyper HTTP/1.1 + HTTP/2, Axum fallback dispatch)
//!     → [routing layer resolves binding + path parameters]
//!     → request.rs (synthesize invocation event)
//!     → Handler::call
//!     → response.rs (adapt invocation result to the wire)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{synthesize_event, EncodingError, InboundRequest};
pub use response::{adapt_response, error_response, ResponseError};
pub use server::{BoundListener, SiteServer, SiteServerHandle};
