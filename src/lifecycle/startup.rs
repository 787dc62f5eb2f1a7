//! Startup orchestration.
//!
//! # Responsibilities
//! - Check the run as a whole before anything binds
//! - Build each site group's router from discovery and the route registry
//! - Bind one listener per site group on consecutive ports
//! - Record every serving group's endpoint in the global config
//!
//! # Design Decisions
//! - Run-level problems (no groups, port overflow, endpoint collisions) are fatal
//! - Group-level problems fail that group only; the others keep starting
//! - Groups start concurrently on the shared runtime

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::EmulatorConfig;
use crate::discovery::{Discovery, DiscoveryError};
use crate::framework::{ConfigurationConflict, GlobalConfig, RouteRegistry, Verb};
use crate::http::server::{BoundListener, SiteServer, SiteServerHandle};
use crate::lifecycle::shutdown::{DrainBudget, Shutdown};
use crate::lifecycle::state::{advance, SiteState};
use crate::net::listener::{self, ListenerError};
use crate::routing::{translate, Binding, PatternError, RouteConflict, RouteInfo, SiteRouter};

/// Settings shared by every site group of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub address: String,
    /// Port of the first group; `0` means ephemeral ports for all.
    pub start_port: u16,
    pub allow_unsupported_routes: bool,
    pub max_body_bytes: usize,
    pub drain: DrainBudget,
}

impl From<&EmulatorConfig> for RunSettings {
    fn from(config: &EmulatorConfig) -> Self {
        Self {
            address: config.listener.address.clone(),
            start_port: config.listener.start_port,
            allow_unsupported_routes: config.routes.allow_unsupported,
            max_body_bytes: config.listener.max_body_bytes,
            drain: DrainBudget::from(&config.shutdown),
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from(&EmulatorConfig::default())
    }
}

/// Why one site group could not start.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("handler `{handler}`: {source}")]
    Pattern {
        handler: String,
        #[source]
        source: PatternError,
    },

    #[error(transparent)]
    RouteConflict(#[from] RouteConflict),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationConflict),

    #[error("listener setup failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
#[error("site group `{group}` failed to start: {source}")]
pub struct SiteGroupError {
    pub group: String,
    #[source]
    pub source: StartupError,
}

/// Problems that abort the whole run before any group binds.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no site groups given")]
    NoSiteGroups,

    #[error("site group `{0}` is listed more than once")]
    DuplicateSiteGroup(String),

    #[error("{count} site groups starting at port {start} run past port 65535")]
    PortRange { start: u16, count: usize },

    #[error(transparent)]
    Configuration(#[from] ConfigurationConflict),
}

/// Starts site groups and hands back their servers.
pub struct Orchestrator {
    discovery: Arc<dyn Discovery>,
    registry: Arc<RouteRegistry>,
    config: Arc<GlobalConfig>,
    settings: RunSettings,
    shutdown: Shutdown,
}

impl Orchestrator {
    pub fn new(
        discovery: Arc<dyn Discovery>,
        registry: Arc<RouteRegistry>,
        config: Arc<GlobalConfig>,
        settings: RunSettings,
    ) -> Self {
        Self {
            discovery,
            registry,
            config,
            settings,
            shutdown: Shutdown::new(),
        }
    }

    pub fn global_config(&self) -> &Arc<GlobalConfig> {
        &self.config
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Route table of `group`, without binding anything.
    pub fn describe(&self, group: &str) -> Result<Vec<RouteInfo>, SiteGroupError> {
        self.build_router(group)
            .map(|router| router.routes())
            .map_err(|source| SiteGroupError {
                group: group.to_string(),
                source,
            })
    }

    /// Discover `group`'s handlers and bind each (pattern, verb) they declare.
    pub fn build_router(&self, group: &str) -> Result<SiteRouter, StartupError> {
        let mut router = SiteRouter::new();

        for (name, factory) in self.discovery.discover(group)? {
            let handler = factory(Arc::clone(&self.config));

            let mut verbs: Vec<Verb> = handler.verbs().to_vec();
            verbs.sort();
            verbs.dedup();
            if verbs.is_empty() {
                tracing::debug!(site_group = %group, handler = %name, "Handler declares no verbs");
                continue;
            }

            let patterns = self.registry.lookup(handler.id());
            if patterns.is_empty() {
                tracing::warn!(
                    site_group = %group,
                    handler = %name,
                    id = %handler.id(),
                    "Handler has no registered routes"
                );
                continue;
            }

            for pattern in patterns {
                let translated = translate(pattern, self.settings.allow_unsupported_routes)
                    .map_err(|source| StartupError::Pattern {
                        handler: name.clone(),
                        source,
                    })?;
                for verb in &verbs {
                    router.insert(
                        pattern,
                        &translated,
                        *verb,
                        Binding {
                            name: name.clone(),
                            handler: Arc::clone(&handler),
                        },
                    )?;
                }
                tracing::debug!(
                    site_group = %group,
                    handler = %name,
                    pattern = %pattern,
                    local = %translated.local,
                    "Route bound"
                );
            }
        }

        Ok(router)
    }

    /// Start every group. Groups that fail are reported in the fleet.
    pub async fn start(&self, groups: &[String]) -> Result<SiteFleet, RunError> {
        self.preflight(groups)?;

        let starts = groups
            .iter()
            .enumerate()
            .map(|(index, group)| self.start_site(group, self.port_for(index)));

        let mut sites = Vec::new();
        let mut failures = Vec::new();
        for outcome in join_all(starts).await {
            match outcome {
                Ok(site) => sites.push(site),
                Err(e) => {
                    tracing::error!(site_group = %e.group, error = %e.source, "Site group failed to start");
                    failures.push(e);
                }
            }
        }

        Ok(SiteFleet {
            sites,
            failures,
            shutdown: self.shutdown.clone(),
            drain: self.settings.drain,
        })
    }

    fn preflight(&self, groups: &[String]) -> Result<(), RunError> {
        if groups.is_empty() {
            return Err(RunError::NoSiteGroups);
        }

        let mut seen = HashSet::new();
        for group in groups {
            if !seen.insert(group.as_str()) {
                return Err(RunError::DuplicateSiteGroup(group.clone()));
            }
        }

        let start = self.settings.start_port;
        if start != 0 && usize::from(start) + groups.len() - 1 > usize::from(u16::MAX) {
            return Err(RunError::PortRange {
                start,
                count: groups.len(),
            });
        }

        for group in groups {
            if let Some(existing) = self.config.get_endpoint(group) {
                return Err(ConfigurationConflict {
                    site_group: group.clone(),
                    existing,
                }
                .into());
            }
        }
        Ok(())
    }

    fn port_for(&self, index: usize) -> u16 {
        match self.settings.start_port {
            0 => 0,
            // preflight keeps this in range
            start => start.saturating_add(index as u16),
        }
    }

    async fn start_site(&self, group: &str, port: u16) -> Result<SiteServerHandle, SiteGroupError> {
        let (state, _) = watch::channel(SiteState::Unstarted);
        advance(&state, group, SiteState::Binding);
        tracing::info!(site_group = %group, port, "Starting site group");

        let (server, bound) = match self.bind_site(group, port).await {
            Ok(prepared) => prepared,
            Err(source) => {
                advance(&state, group, SiteState::Failed);
                return Err(SiteGroupError {
                    group: group.to_string(),
                    source,
                });
            }
        };

        let handle = server.spawn(bound, state, self.shutdown.subscribe());
        tracing::info!(
            site_group = %group,
            endpoint = %handle.endpoint(),
            routes = handle.routes().len(),
            state = %handle.state(),
            "Site group serving"
        );
        Ok(handle)
    }

    /// Everything up to serving: router, socket, endpoint record.
    async fn bind_site(&self, group: &str, port: u16) -> Result<(SiteServer, BoundListener), StartupError> {
        let router = self.build_router(group)?;
        if router.is_empty() {
            tracing::warn!(site_group = %group, "Site group has no routes; every request will get 404");
        }

        let listener = listener::bind(&self.settings.address, port).await?;
        let local_addr = listener.local_addr()?;
        let endpoint = listener::endpoint_url(&self.settings.address, local_addr);
        self.config.add_endpoint(group, endpoint.as_str())?;

        let server = SiteServer::new(group, router, self.settings.max_body_bytes);
        Ok((
            server,
            BoundListener {
                listener,
                local_addr,
                endpoint,
            },
        ))
    }
}

/// Every site group a run managed to start.
pub struct SiteFleet {
    sites: Vec<SiteServerHandle>,
    failures: Vec<SiteGroupError>,
    shutdown: Shutdown,
    drain: DrainBudget,
}

impl SiteFleet {
    pub fn sites(&self) -> &[SiteServerHandle] {
        &self.sites
    }

    pub fn site(&self, group: &str) -> Option<&SiteServerHandle> {
        self.sites.iter().find(|site| site.group() == group)
    }

    pub fn failures(&self) -> &[SiteGroupError] {
        &self.failures
    }

    /// Current state of `group`; `Failed` for groups that never served.
    pub fn state(&self, group: &str) -> Option<SiteState> {
        if let Some(site) = self.site(group) {
            return Some(site.state());
        }
        self.failures
            .iter()
            .any(|f| f.group == group)
            .then_some(SiteState::Failed)
    }

    /// True when no group is serving.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Stop accepting everywhere, then drain all groups concurrently.
    pub async fn shutdown(self) -> Vec<(String, SiteState)> {
        tracing::info!(sites = self.sites.len(), "Shutting down site groups");
        self.shutdown.trigger();

        let drain = self.drain;
        join_all(self.sites.into_iter().map(|site| async move {
            let group = site.group().to_string();
            let state = site.drain(drain).await;
            (group, state)
        }))
        .await
    }
}

impl std::fmt::Debug for SiteFleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteFleet")
            .field("sites", &self.sites)
            .field("failures", &self.failures)
            .finish()
    }
}
