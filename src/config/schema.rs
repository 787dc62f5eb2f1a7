//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML config
//! file. Every section is optional and falls back to its defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the emulator.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Where site servers bind.
    pub listener: ListenerConfig,

    /// Route pattern policy.
    pub routes: RoutePolicyConfig,

    /// Drain budgets.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Endpoints known before any site group starts, by name.
    pub endpoints: BTreeMap<String, String>,

    /// Named values handed to handlers through the global config.
    pub values: BTreeMap<String, serde_json::Value>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address, without port (e.g., "127.0.0.1", "0.0.0.0", "::1").
    pub address: String,

    /// Port of the first site group; the next groups take the following ports.
    /// `0` gives every group an ephemeral port.
    pub start_port: u16,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            start_port: 3000,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RoutePolicyConfig {
    /// Accept regex-constrained path variables the gateway cannot express.
    pub allow_unsupported: bool,
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Seconds in-flight requests get to finish.
    pub request_grace_secs: u64,

    /// Seconds open connections get to close after requests are done.
    pub connection_grace_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            request_grace_secs: 10,
            connection_grace_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format (full, compact, pretty).
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "full".to_string(),
        }
    }
}
