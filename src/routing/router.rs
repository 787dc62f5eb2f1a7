//! Per-site route table.
//!
//! # Responsibilities
//! - Hold every (local pattern, verb) → handler binding of one site group
//! - Resolve a request path and verb to a binding plus decoded parameters
//! - Report an explicit miss: no route, or route without the verb
//!
//! # Design Decisions
//! - Built while the site is binding, immutable once serving
//! - Radix-tree lookup via `matchit`, the same router family axum uses
//! - Routes differing only by variable names or regex constraints share one
//!   radix key and are tried in declaration order
//! - Conflicting registrations fail the build instead of shadowing silently

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::framework::{Handler, Verb};
use crate::routing::matcher::{AndMatcher, Matcher};
use crate::routing::pattern::TranslatedPattern;

#[derive(Debug, Error)]
pub enum RouteConflict {
    #[error("{verb} {resource} is bound to `{existing}`; cannot also bind `{handler}`")]
    DuplicateBinding {
        verb: Verb,
        resource: String,
        existing: String,
        handler: String,
    },

    #[error("route `{resource}` and `{existing}` translate to the same local route `{local}`")]
    Shadowed {
        resource: String,
        existing: String,
        local: String,
    },

    #[error("route `{resource}` cannot be added to the local router: {source}")]
    Insert {
        resource: String,
        #[source]
        source: matchit::InsertError,
    },
}

/// Handler bound to a route.
#[derive(Clone)]
pub struct Binding {
    /// Entry-point name of the handler.
    pub name: String,
    pub handler: Arc<dyn Handler>,
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("handler", &self.handler.id())
            .finish()
    }
}

/// Routes sharing one radix key, tried in declaration order.
#[derive(Debug)]
struct RouteSlot {
    candidates: Vec<Candidate>,
}

#[derive(Debug)]
struct Candidate {
    resource: String,
    local: String,
    params: Vec<String>,
    /// Regex source per parameter position, empty when unconstrained.
    constraint_key: Vec<String>,
    constraints: AndMatcher,
    bindings: BTreeMap<Verb, Binding>,
}

impl Candidate {
    fn new(resource: &str, translated: &TranslatedPattern) -> Self {
        let constraint_key = translated
            .params
            .iter()
            .map(|param| {
                translated
                    .constraints
                    .iter()
                    .find(|c| c.name() == param)
                    .map(|c| c.pattern().to_string())
                    .unwrap_or_default()
            })
            .collect();
        Self {
            resource: resource.to_string(),
            local: translated.local.clone(),
            params: translated.params.clone(),
            constraint_key,
            constraints: AndMatcher::from_constraints(translated.constraints.clone()),
            bindings: BTreeMap::new(),
        }
    }

    /// Catches every path its slot matches.
    fn is_unconstrained(&self) -> bool {
        self.constraints.is_empty()
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub verb: Verb,
    /// The route as declared, in gateway syntax.
    pub resource: &'a str,
    /// Captured parameters, percent-decoded, in pattern order.
    pub params: Vec<(String, String)>,
    pub binding: &'a Binding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMiss {
    NotFound,
    /// The path matched but not the verb; carries the verbs that are bound.
    MethodNotAllowed(Vec<Verb>),
}

/// One row of the route table, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub verb: Verb,
    pub resource: String,
    pub local: String,
    pub handler: String,
}

pub struct SiteRouter {
    inner: matchit::Router<usize>,
    slots: Vec<RouteSlot>,
    by_shape: HashMap<String, usize>,
}

impl SiteRouter {
    pub fn new() -> Self {
        Self {
            inner: matchit::Router::new(),
            slots: Vec::new(),
            by_shape: HashMap::new(),
        }
    }

    /// Bind `verb` on the route declared as `resource`.
    ///
    /// Routes whose local forms differ only by variable names or regex
    /// constraints share a slot and are tried in the order they were added.
    /// A route that can never be reached behind an earlier one is
    /// [`RouteConflict::Shadowed`].
    pub fn insert(
        &mut self,
        resource: &str,
        translated: &TranslatedPattern,
        verb: Verb,
        binding: Binding,
    ) -> Result<(), RouteConflict> {
        let slot_index = match self.by_shape.get(&translated.shape) {
            Some(&index) => index,
            None => {
                let index = self.slots.len();
                self.inner
                    .insert(translated.shape.clone(), index)
                    .map_err(|source| RouteConflict::Insert {
                        resource: resource.to_string(),
                        source,
                    })?;
                self.slots.push(RouteSlot {
                    candidates: Vec::new(),
                });
                self.by_shape.insert(translated.shape.clone(), index);
                index
            }
        };

        let slot = &mut self.slots[slot_index];
        let candidate = match slot.candidates.iter().position(|c| c.resource == resource) {
            Some(index) => &mut slot.candidates[index],
            None => {
                let candidate = Candidate::new(resource, translated);
                if let Some(existing) = slot.candidates.iter().find(|c| {
                    c.is_unconstrained() || c.constraint_key == candidate.constraint_key
                }) {
                    return Err(RouteConflict::Shadowed {
                        resource: resource.to_string(),
                        existing: existing.resource.clone(),
                        local: existing.local.clone(),
                    });
                }
                slot.candidates.push(candidate);
                let last = slot.candidates.len() - 1;
                &mut slot.candidates[last]
            }
        };

        if let Some(existing) = candidate.bindings.get(&verb) {
            return Err(RouteConflict::DuplicateBinding {
                verb,
                resource: resource.to_string(),
                existing: existing.name.clone(),
                handler: binding.name,
            });
        }
        candidate.bindings.insert(verb, binding);
        Ok(())
    }

    /// Resolve `path` for `verb`. `None` is a method with no verb mapping.
    pub fn resolve(&self, path: &str, verb: Option<Verb>) -> Result<RouteMatch<'_>, RouteMiss> {
        let matched = self.inner.at(path).map_err(|_| RouteMiss::NotFound)?;
        let slot = &self.slots[*matched.value];

        let values: Vec<String> = matched
            .params
            .iter()
            .map(|(_, v)| percent_decode_str(v).decode_utf8_lossy().into_owned())
            .collect();

        let mut allowed: Vec<Verb> = Vec::new();
        let mut path_matched = false;
        for candidate in &slot.candidates {
            let params: Vec<(String, String)> = candidate
                .params
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect();
            if !candidate.constraints.matches(&params) {
                continue;
            }
            path_matched = true;
            if let Some((verb, binding)) = verb.and_then(|v| candidate.bindings.get_key_value(&v)) {
                return Ok(RouteMatch {
                    verb: *verb,
                    resource: &candidate.resource,
                    params,
                    binding,
                });
            }
            allowed.extend(candidate.bindings.keys().copied());
        }

        if !path_matched {
            return Err(RouteMiss::NotFound);
        }
        allowed.sort();
        allowed.dedup();
        Err(RouteMiss::MethodNotAllowed(allowed))
    }

    /// Every binding, in route insertion then verb order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.slots
            .iter()
            .flat_map(|slot| &slot.candidates)
            .flat_map(|candidate| {
                candidate.bindings.iter().map(|(verb, binding)| RouteInfo {
                    verb: *verb,
                    resource: candidate.resource.clone(),
                    local: candidate.local.clone(),
                    handler: binding.name.clone(),
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for SiteRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SiteRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteRouter").field("slots", &self.slots).finish()
    }
}
