//! siterun binary: serves the built-in `echo` site group plus anything
//! registered below.

use std::process::ExitCode;

use clap::Parser;

use siterun::cli::{self, Cli};
use siterun::{echo, EntryPoints, RouteRegistry};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: cannot start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let code = runtime.block_on(async move {
        let mut entries = EntryPoints::new();
        let mut registry = RouteRegistry::new();
        echo::install(&mut entries, &mut registry);

        match cli::execute(cli, entries, registry).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "siterun failed");
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        }
    });

    // Handler calls still running past the drain budgets are abandoned.
    runtime.shutdown_background();
    code
}
