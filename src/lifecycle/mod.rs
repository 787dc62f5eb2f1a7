//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Preflight → per group: discover → build router → bind → record endpoint
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain requests → Close connections
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Each site group moves through its own state machine (state.rs)
//! - One group failing to start does not stop the others
//! - Shutdown has two budgets: forced close after the connection deadline

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use shutdown::{DrainBudget, Shutdown};
pub use startup::{Orchestrator, RunError, RunSettings, SiteFleet, SiteGroupError, StartupError};
pub use state::SiteState;
