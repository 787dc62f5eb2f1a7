//! Run-wide configuration shared with every handler.
//!
//! Holds the endpoint of each site group (local or pre-declared) and an open
//! bag of named values. Both maps are concurrent so site groups can record
//! their endpoints while binding in parallel.

use std::collections::BTreeMap;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;

/// A site group tried to claim an endpoint that is already recorded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("site group `{site_group}` already has an endpoint ({existing})")]
pub struct ConfigurationConflict {
    pub site_group: String,
    pub existing: String,
}

#[derive(Debug, Default)]
pub struct GlobalConfig {
    endpoints: DashMap<String, String>,
    values: DashMap<String, Value>,
}

impl GlobalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the endpoint of `site_group`. An endpoint is set at most once.
    pub fn add_endpoint(
        &self,
        site_group: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<(), ConfigurationConflict> {
        match self.endpoints.entry(site_group.into()) {
            Entry::Occupied(entry) => Err(ConfigurationConflict {
                site_group: entry.key().clone(),
                existing: entry.get().clone(),
            }),
            Entry::Vacant(entry) => {
                tracing::debug!(site_group = %entry.key(), "Endpoint recorded");
                entry.insert(endpoint.into());
                Ok(())
            }
        }
    }

    pub fn get_endpoint(&self, site_group: &str) -> Option<String> {
        self.endpoints.get(site_group).map(|e| e.value().clone())
    }

    /// Snapshot of every recorded endpoint.
    pub fn endpoints(&self) -> BTreeMap<String, String> {
        self.endpoints
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Set a named value, returning the previous one.
    pub fn set_value(&self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    pub fn get_value(&self, name: &str) -> Option<Value> {
        self.values.get(name).map(|v| v.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn second_add_conflicts_and_keeps_first() {
        let config = GlobalConfig::new();
        config.add_endpoint("site", "http://localhost:3000").unwrap();

        let err = config
            .add_endpoint("site", "http://localhost:4000")
            .unwrap_err();
        assert_eq!(err.site_group, "site");
        assert_eq!(err.existing, "http://localhost:3000");
        assert_eq!(
            config.get_endpoint("site").as_deref(),
            Some("http://localhost:3000")
        );
    }

    #[test]
    fn unknown_group_has_no_endpoint() {
        let config = GlobalConfig::new();
        assert!(config.get_endpoint("missing").is_none());
        assert!(config.endpoints().is_empty());
    }

    #[test]
    fn concurrent_inserts_under_distinct_keys() {
        let config = Arc::new(GlobalConfig::new());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let config = config.clone();
                std::thread::spawn(move || {
                    config
                        .add_endpoint(format!("group-{i}"), format!("http://localhost:{}", 3000 + i))
                        .unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(config.endpoints().len(), 8);
        assert_eq!(
            config.get_endpoint("group-5").as_deref(),
            Some("http://localhost:3005")
        );
    }

    #[test]
    fn values_bag() {
        let config = GlobalConfig::new();
        assert!(config.set_value("stage", Value::from("dev")).is_none());
        assert_eq!(config.get_value("stage"), Some(Value::from("dev")));
        assert_eq!(
            config.set_value("stage", Value::from("prod")),
            Some(Value::from("dev"))
        );
    }
}
