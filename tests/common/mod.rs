//! Shared handlers and helpers for site group integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use siterun::discovery::EntryPoints;
use siterun::framework::{
    FromConfig, GlobalConfig, Handler, HandlerResult, InvocationContext, InvocationEvent,
    InvocationResult, RouteRegistry, Verb,
};
use siterun::lifecycle::{DrainBudget, Orchestrator, RunSettings};

/// Returns the event it was given, as JSON.
pub struct ItemsHandler;

impl FromConfig for ItemsHandler {
    fn from_config(_: Arc<GlobalConfig>) -> Self {
        ItemsHandler
    }
}

impl Handler for ItemsHandler {
    fn verbs(&self) -> &[Verb] {
        &[Verb::Get, Verb::Post]
    }

    fn call(&self, _: Verb, event: &InvocationEvent, _: Option<&InvocationContext>) -> HandlerResult {
        Ok(Some(InvocationResult::json(event)?))
    }
}

/// Answers with nothing at all.
pub struct PingHandler;

impl FromConfig for PingHandler {
    fn from_config(_: Arc<GlobalConfig>) -> Self {
        PingHandler
    }
}

impl Handler for PingHandler {
    fn verbs(&self) -> &[Verb] {
        &[Verb::Post]
    }

    fn call(&self, _: Verb, _: &InvocationEvent, _: Option<&InvocationContext>) -> HandlerResult {
        Ok(None)
    }
}

/// Always fails.
pub struct FailingHandler;

impl FromConfig for FailingHandler {
    fn from_config(_: Arc<GlobalConfig>) -> Self {
        FailingHandler
    }
}

impl Handler for FailingHandler {
    fn verbs(&self) -> &[Verb] {
        &[Verb::Get]
    }

    fn call(&self, _: Verb, _: &InvocationEvent, _: Option<&InvocationContext>) -> HandlerResult {
        Err("downstream unavailable".into())
    }
}

/// Blocks for a while before answering.
pub struct SlowHandler;

pub const SLOW_HANDLER_DELAY: Duration = Duration::from_millis(400);

impl FromConfig for SlowHandler {
    fn from_config(_: Arc<GlobalConfig>) -> Self {
        SlowHandler
    }
}

impl Handler for SlowHandler {
    fn verbs(&self) -> &[Verb] {
        &[Verb::Get]
    }

    fn call(&self, _: Verb, _: &InvocationEvent, _: Option<&InvocationContext>) -> HandlerResult {
        std::thread::sleep(SLOW_HANDLER_DELAY);
        Ok(Some(InvocationResult::new().body("done")))
    }
}

/// Blocks far longer than any drain budget used in tests.
pub struct StuckHandler;

pub const STUCK_HANDLER_DELAY: Duration = Duration::from_secs(3);

impl FromConfig for StuckHandler {
    fn from_config(_: Arc<GlobalConfig>) -> Self {
        StuckHandler
    }
}

impl Handler for StuckHandler {
    fn verbs(&self) -> &[Verb] {
        &[Verb::Get]
    }

    fn call(&self, _: Verb, _: &InvocationEvent, _: Option<&InvocationContext>) -> HandlerResult {
        std::thread::sleep(STUCK_HANDLER_DELAY);
        Ok(Some(InvocationResult::new().body("late")))
    }
}

/// Settings on `port` with drain budgets short enough for tests.
pub fn settings(port: u16) -> RunSettings {
    RunSettings {
        address: "127.0.0.1".to_string(),
        start_port: port,
        allow_unsupported_routes: false,
        max_body_bytes: 64 * 1024,
        drain: DrainBudget {
            request_grace: Duration::from_secs(2),
            connection_grace: Duration::from_millis(500),
        },
    }
}

pub fn orchestrator(
    entries: EntryPoints,
    registry: RouteRegistry,
    settings: RunSettings,
) -> Orchestrator {
    Orchestrator::new(
        Arc::new(entries),
        Arc::new(registry),
        Arc::new(GlobalConfig::new()),
        settings,
    )
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub fn groups(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
