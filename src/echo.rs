//! Built-in `echo` site group.
//!
//! Answers every verb on every path with the synthesized event as JSON, and
//! lists the run's endpoints at `/_endpoints`. Handy for poking at the
//! emulator without writing any handlers.

use std::sync::Arc;

use crate::discovery::EntryPoints;
use crate::framework::{
    FromConfig, GlobalConfig, Handler, HandlerResult, InvocationContext, InvocationEvent,
    InvocationResult, RouteRegistry, Verb,
};

pub const GROUP: &str = "echo";

/// Reflects the request back.
pub struct EchoHandler;

impl FromConfig for EchoHandler {
    fn from_config(_: Arc<GlobalConfig>) -> Self {
        EchoHandler
    }
}

impl Handler for EchoHandler {
    fn verbs(&self) -> &[Verb] {
        &Verb::ALL
    }

    fn call(
        &self,
        _verb: Verb,
        event: &InvocationEvent,
        context: Option<&InvocationContext>,
    ) -> HandlerResult {
        let mut result = InvocationResult::json(event)?;
        if let Some(context) = context {
            result = result.header("X-Request-Id", context.request_id.to_string());
        }
        Ok(Some(result))
    }
}

/// Lists every endpoint recorded in the global config.
pub struct EndpointsHandler {
    config: Arc<GlobalConfig>,
}

impl FromConfig for EndpointsHandler {
    fn from_config(config: Arc<GlobalConfig>) -> Self {
        Self { config }
    }
}

impl Handler for EndpointsHandler {
    fn verbs(&self) -> &[Verb] {
        &[Verb::Get]
    }

    fn call(&self, _: Verb, _: &InvocationEvent, _: Option<&InvocationContext>) -> HandlerResult {
        Ok(Some(InvocationResult::json(&self.config.endpoints())?))
    }
}

/// Register the echo group's handlers and routes.
pub fn install(entries: &mut EntryPoints, registry: &mut RouteRegistry) {
    entries
        .register_handler::<EchoHandler>(GROUP, "echo")
        .register_handler::<EndpointsHandler>(GROUP, "endpoints");
    registry
        .register::<EchoHandler, _, _>(["/", "/{proxy+}"])
        .register::<EndpointsHandler, _, _>(["/_endpoints"]);
}
