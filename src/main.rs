//! tcpsweep - A concurrent IPv4 TCP connect scanner.

use anyhow::Context;
use clap::Parser;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use tcpsweep::cli::{self, Cli};
use tcpsweep::config::{AppSettings, RunMode};
use tcpsweep::dns::{NameResolver, SystemResolver};
use tcpsweep::output;
use tcpsweep::shutdown::{self, ShutdownTrigger};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

/// Install the log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "tcpsweep=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = match &cli.config {
        Some(path) => AppSettings::load_from(path),
        None => AppSettings::load(),
    }
    .context("failed to load settings")?;

    let mode = cli.run_mode(&settings)?;
    let report = cli.report_options();
    let resolver: Arc<dyn NameResolver> = Arc::new(SystemResolver::new());

    let (trigger, signal) = shutdown::channel();
    tokio::spawn(watch_ctrl_c(trigger));

    match mode {
        RunMode::Scan(plan) => {
            let target = plan.target.to_string();
            cli::execute_scan(plan, report, cli.stats_interval(), resolver, signal, io::stdout())
                .await
                .with_context(|| format!("scan of {target} failed"))?;
        }
        RunMode::Listen(plan) => {
            cli::execute_listen(plan, report, resolver, signal, io::stdout())
                .await
                .context("listen mode failed")?;
        }
    }
    Ok(())
}

/// First Ctrl-C requests a graceful stop; a second one exits at once.
async fn watch_ctrl_c(trigger: ShutdownTrigger) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    eprintln!("\nYou pressed Ctrl+C");
    trigger.trigger();

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(130);
    }
}
