//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (body limit > 0)
//! - Check that pre-seeded endpoints are absolute URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EmulatorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::EmulatorConfig;

pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
pub const LOG_FORMATS: &[&str] = &["full", "compact", "pretty"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.address must not be empty")]
    EmptyAddress,

    #[error("listener.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("endpoint `{name}` has invalid URL `{url}`: {reason}")]
    InvalidEndpoint {
        name: String,
        url: String,
        reason: String,
    },

    #[error("unknown log level `{0}`")]
    UnknownLogLevel(String),

    #[error("unknown log format `{0}`")]
    UnknownLogFormat(String),
}

pub fn validate_config(config: &EmulatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.address.trim().is_empty() {
        errors.push(ValidationError::EmptyAddress);
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    for (name, raw) in &config.endpoints {
        if let Err(reason) = check_endpoint(raw) {
            errors.push(ValidationError::InvalidEndpoint {
                name: name.clone(),
                url: raw.clone(),
                reason,
            });
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if !LOG_FORMATS.contains(&config.observability.log_format.as_str()) {
        errors.push(ValidationError::UnknownLogFormat(
            config.observability.log_format.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_endpoint(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| e.to_string())?;
    if parsed.cannot_be_a_base() {
        return Err("not a base URL".to_string());
    }
    Ok(())
}
