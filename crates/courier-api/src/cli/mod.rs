//! CLI command definitions for the `courier` binary.
//!
//! Every subcommand drives a real in-process `EventBus` so the delivery modes
//! can be watched from a terminal (`courier ping`, `courier fanout`, ...).

pub mod config;
pub mod demo;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Drive an in-process Courier event bus.
#[derive(Parser)]
#[command(name = "courier", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory holding config.toml (defaults to ~/.courier).
    #[arg(long, global = true, env = "COURIER_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a request to a responder and report the outcome and latency.
    Ping {
        /// How long the responder waits before replying.
        #[arg(long, default_value = "0")]
        delay_ms: u64,

        /// Reply timeout (defaults to the configured default_timeout_ms).
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Publish one message to N consumers and count deliveries.
    Fanout {
        /// Number of consumers registered at the address.
        #[arg(long, default_value = "3")]
        consumers: usize,
    },

    /// Send M messages to N consumers and show how they were distributed.
    RoundRobin {
        /// Number of consumers registered at the address.
        #[arg(long, default_value = "3")]
        consumers: usize,

        /// Number of point-to-point sends.
        #[arg(long, default_value = "9")]
        sends: usize,
    },

    /// Print the effective bus configuration.
    Config,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
