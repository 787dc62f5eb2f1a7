//! Post-match checks on captured path parameters.
//!
//! # Design Decisions
//! - The radix router only knows segment shapes; anything finer (regex
//!   constraints allowed by override) is checked here after a match
//! - A failed check is reported as "no route", same as a router miss
//! - Empty condition set = always matches

use regex::Regex;

/// Condition over the parameters captured by a route.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the captured parameters satisfy this condition.
    fn matches(&self, params: &[(String, String)]) -> bool;
}

/// A regex that one named parameter must match in full.
#[derive(Debug, Clone)]
pub struct PathConstraint {
    name: String,
    regex: Regex,
}

impl PathConstraint {
    /// `regex` is expected to be anchored already.
    pub fn new(name: impl Into<String>, regex: Regex) -> Self {
        Self {
            name: name.into(),
            regex,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source of the anchored regex.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn accepts(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl Matcher for PathConstraint {
    fn matches(&self, params: &[(String, String)]) -> bool {
        params
            .iter()
            .find(|(k, _)| *k == self.name)
            .map(|(_, v)| self.accepts(v))
            .unwrap_or(false)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug, Default)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    pub fn from_constraints(constraints: Vec<PathConstraint>) -> Self {
        Self::new(
            constraints
                .into_iter()
                .map(|c| Box::new(c) as Box<dyn Matcher>)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, params: &[(String, String)]) -> bool {
        self.matchers.iter().all(|m| m.matches(params))
    }
}
