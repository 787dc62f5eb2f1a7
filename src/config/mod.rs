//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EmulatorConfig (validated, immutable)
//!     → CLI flags override individual fields
//!     → RunSettings + GlobalConfig seed values
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no reload while serving
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    EmulatorConfig, ListenerConfig, ObservabilityConfig, RoutePolicyConfig, ShutdownConfig,
};
pub use validation::{validate_config, ValidationError};
