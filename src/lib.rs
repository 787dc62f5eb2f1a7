//! siterun: local invocation emulator for HTTP-triggered handlers.
//!
//! # Architecture Overview
//!
//! ```text
//!     ┌──────────────────────────────────────────────────────────────────┐
//!     │                           SITERUN                                 │
//!     │                                                                   │
//!     │  ┌───────────┐   ┌───────────────┐   ┌────────────────────────┐  │
//!     │  │ discovery │──▶│   lifecycle   │──▶│ routing (per group)    │  │
//!     │  │entry point│   │ orchestrator  │   │ translate + SiteRouter │  │
//!     │  └───────────┘   └───────┬───────┘   └────────────────────────┘  │
//!     │                          │ one listener per site group            │
//!     │                          ▼                                        │
//!  ───┼──▶ net::listener ─▶ http::server ─▶ request ─▶ Handler ─▶ response ┼──▶
//!     │                                                                   │
//!     │  ┌──────────────────────────────────────────────────────────────┐ │
//!     │  │                    Cross-Cutting Concerns                     │ │
//!     │  │   framework (GlobalConfig, RouteRegistry)   config            │ │
//!     │  │   observability                             lifecycle         │ │
//!     │  └──────────────────────────────────────────────────────────────┘ │
//!     └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Embedding: register handlers with [`discovery::EntryPoints`] and their routes
//! with [`framework::RouteRegistry`], then hand both to [`cli::execute`] or to a
//! [`lifecycle::Orchestrator`].

pub mod cli;
pub mod config;
pub mod discovery;
pub mod echo;
pub mod framework;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::EmulatorConfig;
pub use discovery::{Discovery, EntryPoints};
pub use framework::{
    FromConfig, GlobalConfig, Handler, HandlerResult, InvocationContext, InvocationEvent,
    InvocationResult, RouteRegistry, Verb,
};
pub use lifecycle::{Orchestrator, RunSettings, SiteFleet};
