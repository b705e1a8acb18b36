//! # Workout Queue Worker
//!
//! Runs the notification listener and worker pool against PostgreSQL until
//! Ctrl+C or SIGTERM, then shuts down gracefully.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use workout_queue::config::ConfigLoader;
use workout_queue::extraction::WitExtractor;
use workout_queue::logging::init_structured_logging;
use workout_queue::WorkQueue;

#[derive(Parser, Debug)]
#[command(name = "workout-queue-worker")]
#[command(about = "Process queued workout logs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (TOML); defaults to WORKOUT_QUEUE_CONFIG_PATH or config/workout-queue.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured number of workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Validate configuration, print it with secrets masked, and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_structured_logging();

    let mut config =
        ConfigLoader::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(workers) = cli.workers {
        config.worker.count = workers;
        config.validate().context("invalid --workers override")?;
    }

    if cli.check_config {
        println!("{}", serde_json::to_string_pretty(&config.sanitized())?);
        return Ok(());
    }

    let extractor = Arc::new(
        WitExtractor::new(&config.extractor).context("failed to build extractor client")?,
    );
    let queue = WorkQueue::bootstrap(&config, extractor)
        .await
        .context("failed to start work queue")?;

    info!(workers = config.worker.count, "🔄 Worker running... Press Ctrl+C to shutdown gracefully");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("⚠️  Error waiting for Ctrl+C: {}", e);
            }
            info!("🛑 Received Ctrl+C, initiating graceful shutdown...");
        }
        result = wait_for_sigterm() => {
            match result {
                Ok(()) => info!("🛑 Received SIGTERM, initiating graceful shutdown..."),
                Err(e) => warn!("⚠️  Error setting up SIGTERM handler: {}", e),
            }
        }
    }

    queue.shutdown().await;
    info!("✅ Worker shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    std::future::pending::<()>().await;
    Ok(())
}
