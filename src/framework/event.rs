//! Invocation contract types.
//!
//! Field names follow the gateway's proxy-integration event so handlers
//! written against the emulator read the same JSON shape once deployed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event passed to a handler for one HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    pub http_method: String,
    pub path: String,
    pub path_parameters: BTreeMap<String, String>,
    pub query_string_parameters: BTreeMap<String, String>,
    /// Header values as received. Names arrive lowercased because the HTTP
    /// transport normalizes them; use [`InvocationEvent::header`] for lookups.
    pub headers: BTreeMap<String, String>,
    pub request_context: RequestContext,
    /// Route pattern that matched, in gateway syntax.
    pub resource: String,
    pub body: String,
}

impl InvocationEvent {
    /// Header lookup ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn source_ip(&self) -> Option<&str> {
        self.request_context.identity.source_ip.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.request_context.identity.user_agent.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub identity: Identity,
}

/// Caller identity as seen by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Optional per-invocation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationContext {
    pub request_id: Uuid,
    pub site_group: String,
    pub function_name: String,
}

impl InvocationContext {
    pub fn new(site_group: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            site_group: site_group.into(),
            function_name: function_name.into(),
        }
    }
}

/// Value returned by a handler. Missing fields mean empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl InvocationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON body with a matching `Content-Type`.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_string(value)?;
        Ok(Self::new()
            .header("Content-Type", "application/json")
            .body(body))
    }
}
