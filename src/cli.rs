//! Command-line surface.
//!
//! ```text
//! siterun [--config FILE] [--log-level LEVEL] [--log-format FORMAT] <COMMAND>
//!
//!   run <GROUP>...      serve each site group on its own port
//!   routes <GROUP>...   print each site group's route table
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::config::{load_config, validate_config, ConfigError, EmulatorConfig};
use crate::discovery::EntryPoints;
use crate::framework::{ConfigurationConflict, GlobalConfig, RouteRegistry};
use crate::lifecycle::{signals, Orchestrator, RunError, RunSettings, SiteGroupError};
use crate::observability::{logging, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "siterun", version)]
#[command(about = "Run HTTP-triggered handlers locally, one server per site group", long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (full, compact, pretty).
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve site groups until interrupted
    Run(RunArgs),
    /// Print the route table of site groups without serving
    Routes(RoutesArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Site groups to serve, in port order.
    #[arg(required = true)]
    pub groups: Vec<String>,

    /// Bind address [default: 127.0.0.1]
    #[arg(long)]
    pub address: Option<String>,

    /// Port of the first site group [default: 3000]
    #[arg(long)]
    pub port: Option<u16>,

    /// Accept route patterns the gateway would reject.
    #[arg(long)]
    pub allow_unsupported_routes: bool,

    /// Extra endpoint known to handlers, as NAME=URL. Repeatable.
    #[arg(long = "endpoint", value_name = "NAME=URL", value_parser = parse_endpoint)]
    pub endpoints: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct RoutesArgs {
    #[arg(required = true)]
    pub groups: Vec<String>,

    /// Accept route patterns the gateway would reject.
    #[arg(long)]
    pub allow_unsupported_routes: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid --log-format: {0}")]
    LogFormat(#[from] logging::UnknownLogFormat),

    #[error(transparent)]
    Conflict(#[from] ConfigurationConflict),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    SiteGroup(#[from] SiteGroupError),

    #[error("no site group could be started ({failed} failed)")]
    NothingServing { failed: usize },
}

fn parse_endpoint(raw: &str) -> Result<(String, String), String> {
    let (name, url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=URL, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("endpoint name is empty".to_string());
    }
    url::Url::parse(url).map_err(|e| format!("invalid URL `{url}`: {e}"))?;
    Ok((name.to_string(), url.to_string()))
}

/// File config (or defaults) with global flag overrides applied.
pub fn resolve_config(cli: &Cli) -> Result<EmulatorConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EmulatorConfig::default(),
    };

    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.observability.log_format = format.clone();
    }

    match &cli.command {
        Command::Run(args) => {
            if let Some(address) = &args.address {
                config.listener.address = address.clone();
            }
            if let Some(port) = args.port {
                config.listener.start_port = port;
            }
            config.routes.allow_unsupported |= args.allow_unsupported_routes;
        }
        Command::Routes(args) => {
            config.routes.allow_unsupported |= args.allow_unsupported_routes;
        }
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse-independent entry point; the binary and embedders call this with
/// their own handlers registered.
pub async fn execute(cli: Cli, entries: EntryPoints, registry: RouteRegistry) -> Result<(), CliError> {
    let config = resolve_config(&cli)?;
    let format: LogFormat = config.observability.log_format.parse()?;
    logging::init(&config.observability.log_level, format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "siterun starting");

    match cli.command {
        Command::Run(args) => run(config, args, entries, registry).await,
        Command::Routes(args) => routes(config, &args.groups, entries, registry),
    }
}

fn seed_global_config(
    config: &EmulatorConfig,
    extra_endpoints: &[(String, String)],
) -> Result<Arc<GlobalConfig>, ConfigurationConflict> {
    let global = GlobalConfig::new();
    for (name, value) in &config.values {
        global.set_value(name.clone(), value.clone());
    }
    for (name, url) in config.endpoints.iter().chain(
        extra_endpoints.iter().map(|(name, url)| (name, url)),
    ) {
        global.add_endpoint(name.clone(), url.clone())?;
    }
    Ok(Arc::new(global))
}

async fn run(
    config: EmulatorConfig,
    args: RunArgs,
    entries: EntryPoints,
    registry: RouteRegistry,
) -> Result<(), CliError> {
    let global = seed_global_config(&config, &args.endpoints).map_err(|e| {
        tracing::error!(error = %e, "Conflicting endpoint definitions");
        e
    })?;

    let orchestrator = Orchestrator::new(
        Arc::new(entries),
        Arc::new(registry),
        global,
        RunSettings::from(&config),
    );
    let fleet = orchestrator.start(&args.groups).await.map_err(|e| {
        tracing::error!(error = %e, "Run aborted before serving");
        e
    })?;

    if fleet.is_empty() {
        return Err(CliError::NothingServing {
            failed: fleet.failures().len(),
        });
    }

    for site in fleet.sites() {
        println!("{:<20} {}", site.group(), site.endpoint());
    }
    for failure in fleet.failures() {
        eprintln!("{:<20} FAILED: {}", failure.group, failure.source);
    }

    signals::wait_for_signal().await;

    for (group, state) in fleet.shutdown().await {
        tracing::info!(site_group = %group, state = %state, "Site group finished");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

fn routes(
    config: EmulatorConfig,
    groups: &[String],
    entries: EntryPoints,
    registry: RouteRegistry,
) -> Result<(), CliError> {
    let orchestrator = Orchestrator::new(
        Arc::new(entries),
        Arc::new(registry),
        seed_global_config(&config, &[])?,
        RunSettings::from(&config),
    );

    for group in groups {
        let table = orchestrator.describe(group).map_err(|e| {
            tracing::error!(site_group = %e.group, error = %e.source, "Cannot build routes");
            e
        })?;
        println!("{group}");
        if table.is_empty() {
            println!("  (no routes)");
        }
        for route in table {
            println!(
                "  {:<8} {:<32} {:<32} {}",
                route.verb.as_str(),
                route.resource,
                route.local,
                route.handler
            );
        }
    }
    Ok(())
}
