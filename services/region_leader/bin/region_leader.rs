//! Region leader binary - one process per region leader
//!
//! Usage:
//!   region_leader --config config/leader.toml
//!   region_leader --config config/leader.toml --environment local --json-logs

use anyhow::Result;
use clap::Parser;
use leader_config::LeaderConfig;
use region_leader::{LoggingPlanSink, RegionLeader};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "region_leader")]
#[command(about = "DCOP region leader")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Environment overlay under environments/ next to the config file
    #[arg(short, long)]
    environment: Option<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting region leader");
    info!("Configuration: {}", args.config.display());

    let config = LeaderConfig::load(&args.config, args.environment.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {:#}", e);
        e
    })?;

    info!(
        "Loaded configuration for region {} (node {}, algorithm {})",
        config.leader.region, config.leader.node, config.dcop.algorithm
    );

    let leader = RegionLeader::from_config(&config, Arc::new(LoggingPlanSink))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    leader.run(shutdown).await?;
    info!("Region leader stopped");
    Ok(())
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn wait_for_shutdown(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for CTRL+C, shutting down: {}", e),
    }
    shutdown.cancel();
}
