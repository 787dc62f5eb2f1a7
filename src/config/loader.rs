//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::EmulatorConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<EmulatorConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: EmulatorConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("siterun-{}-{}.toml", name, std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_valid_file() {
        let path = scratch("valid", "[listener]\nstart_port = 4100\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.start_port, 4100);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn reports_each_failure_kind() {
        let missing = std::env::temp_dir().join("siterun-does-not-exist.toml");
        assert!(matches!(load_config(&missing), Err(ConfigError::Io { .. })));

        let path = scratch("malformed", "[listener\n");
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
        fs::remove_file(path).unwrap();

        let path = scratch("invalid", "[observability]\nlog_format = \"xml\"\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unknown log format"));
        fs::remove_file(path).unwrap();
    }
}
