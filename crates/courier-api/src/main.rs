//! Courier command-line entry point.
//!
//! Binary name: `courier`
//!
//! Parses CLI arguments, sets up tracing, loads the bus configuration and
//! runs one demo against a fresh in-process `EventBus`.

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use courier_core::{EventBus, TracingSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,courier=debug",
        _ => "trace",
    };
    courier_observe::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need a bus
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "courier", &mut std::io::stdout());
        return Ok(());
    }

    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(courier_infra::resolve_config_dir);
    let config = courier_infra::load_bus_config(&config_dir).await;
    tracing::debug!(config_dir = %config_dir.display(), ?config, "configuration loaded");

    let bus = Arc::new(EventBus::with_config(&config, Arc::new(TracingSink))?);

    let result = match cli.command {
        Commands::Ping {
            delay_ms,
            timeout_ms,
        } => cli::demo::ping(bus, Duration::from_millis(delay_ms), timeout_ms, cli.json).await,
        Commands::Fanout { consumers } => cli::demo::fanout(bus, consumers, cli.json).await,
        Commands::RoundRobin { consumers, sends } => {
            cli::demo::round_robin(bus, consumers, sends, cli.json).await
        }
        Commands::Config => cli::config::show_config(&config_dir, &config, cli.json),
        Commands::Completions { .. } => unreachable!("handled above"),
    };

    courier_observe::shutdown_tracing();
    result
}
