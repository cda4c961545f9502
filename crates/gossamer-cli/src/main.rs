//! gossamer node binary.
//!
//! Runs one workload as a node speaking line-delimited JSON: requests on
//! stdin, replies and peer traffic on stdout, logs on stderr.
//!
//! # Quick Start
//!
//! ```bash
//! # Gossip broadcast node with a 50ms gossip interval
//! gossamer broadcast --gossip-interval-ms 50
//!
//! # Grow-only counter node, debug logging
//! gossamer --debug counter
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gossamer_config::{ConfigLoader, GossamerConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// gossamer - line-protocol node runtime for distributed-systems workloads.
#[derive(Parser)]
#[command(name = "gossamer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Log at debug level (also: GOSSAMER_LOG__DEBUG=true or DEBUG=1).
    #[arg(long, global = true)]
    debug: bool,

    /// Directory containing gossamer.toml and gossamer.local.toml.
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Period of the hook timer in milliseconds; 0 runs hooks only on input.
    #[arg(long, global = true, value_name = "MS")]
    tick_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a gossip broadcast node.
    Broadcast {
        /// Minimum spacing between gossip rounds.
        #[arg(long, value_name = "MS")]
        gossip_interval_ms: Option<u64>,

        /// Send every neighbour the full set each round.
        #[arg(long)]
        no_neighbor_tracking: bool,
    },

    /// Run a grow-only counter node.
    Counter {
        /// Key-value service holding the per-node totals.
        #[arg(long, value_name = "NAME")]
        service: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    init_logging(config.log.debug);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async {
        match cli.command {
            Commands::Broadcast { .. } => commands::broadcast::run(&config).await,
            Commands::Counter { .. } => commands::counter::run(&config).await,
        }
    })
}

/// Loads file and environment configuration, then applies CLI flags on top.
fn load_config(cli: &Cli) -> Result<GossamerConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(dir) = &cli.global.config_dir {
        loader = loader.with_project_dir(dir);
    }
    let mut config = loader.load().context("Failed to load configuration")?;

    config.log.debug |= cli.global.debug;
    if let Some(tick_ms) = cli.global.tick_ms {
        config.runtime.tick_ms = tick_ms;
    }
    match &cli.command {
        Commands::Broadcast {
            gossip_interval_ms,
            no_neighbor_tracking,
        } => {
            if let Some(interval_ms) = gossip_interval_ms {
                config.gossip.interval_ms = *interval_ms;
            }
            if *no_neighbor_tracking {
                config.gossip.track_neighbors = false;
            }
        }
        Commands::Counter { service } => {
            if let Some(service) = service {
                config.counter.service.clone_from(service);
            }
        }
    }

    config.validate().context("Invalid command-line options")?;
    Ok(config)
}

/// Logs to stderr; stdout carries the protocol. `RUST_LOG` overrides the
/// default level.
fn init_logging(debug: bool) {
    let level = if debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();
}
