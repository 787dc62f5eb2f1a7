//! In-process entry-point table.
//!
//! Entries are registered under a group and a name and hold a type-erased
//! loader. Loading a group runs every loader in registration order and
//! downcasts the result to the type the caller expects.

use std::any::Any;
use std::sync::Arc;

use crate::discovery::DiscoveryError;

/// Loaded entry value, before the type check.
pub type Loaded = Box<dyn Any + Send + Sync>;

/// Loader for a single entry. The error string is the load failure reason.
pub type Loader = Arc<dyn Fn() -> Result<Loaded, String> + Send + Sync>;

#[derive(Clone)]
struct EntryPoint {
    group: String,
    name: String,
    loader: Loader,
}

#[derive(Clone, Default)]
pub struct EntryPoints {
    entries: Vec<EntryPoint>,
}

impl EntryPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-built value.
    pub fn register<T>(&mut self, group: impl Into<String>, name: impl Into<String>, value: T) -> &mut Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.register_loader(group, name, Arc::new(move || Ok(Box::new(value.clone()) as Loaded)))
    }

    /// Register a loader. A later entry with the same group and name
    /// replaces the earlier one in place.
    pub fn register_loader(
        &mut self,
        group: impl Into<String>,
        name: impl Into<String>,
        loader: Loader,
    ) -> &mut Self {
        let group = group.into();
        let name = name.into();
        match self
            .entries
            .iter_mut()
            .find(|e| e.group == group && e.name == name)
        {
            Some(existing) => {
                tracing::warn!(group = %group, name = %name, "Entry point redefined");
                existing.loader = loader;
            }
            None => self.entries.push(EntryPoint { group, name, loader }),
        }
        self
    }

    /// Load every entry of `group` as a `T`.
    pub fn load<T>(&self, group: &str) -> Result<Vec<(String, T)>, DiscoveryError>
    where
        T: 'static,
    {
        let mut loaded = Vec::new();
        for entry in self.entries.iter().filter(|e| e.group == group) {
            let value = (entry.loader)().map_err(|reason| DiscoveryError::Load {
                group: group.to_string(),
                name: entry.name.clone(),
                reason,
            })?;
            let value = value.downcast::<T>().map_err(|_| DiscoveryError::TypeConstraintViolation {
                group: group.to_string(),
                name: entry.name.clone(),
                expected: std::any::type_name::<T>(),
            })?;
            loaded.push((entry.name.clone(), *value));
        }
        Ok(loaded)
    }
}

impl std::fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| format!("{}:{}", e.group, e.name)))
            .finish()
    }
}
