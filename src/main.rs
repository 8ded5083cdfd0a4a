//! SimLink - keeps flight simulator data and home cockpit hardware in sync
//!
//! Main entry point for the headless engine.
//!
//! # Overview
//!
//! This binary initializes:
//! - Settings ([`ConfigManager`]: `simlink.yaml` + `SIMLINK__*` environment overrides)
//! - Logging infrastructure (daily rotating file + optional console output)
//! - The reconciliation loop ([`ExecutionManager`]) on the tokio runtime
//!
//! # Usage
//!
//! ```text
//! simlink [CONFIG_DIR] [PROJECT]
//! ```
//!
//! `CONFIG_DIR` defaults to the current directory. `PROJECT` is a YAML project
//! snapshot; without one the engine starts with an empty project.
//!
//! # Execution Flow
//!
//! 1. Load settings from `CONFIG_DIR`
//! 2. Initialize logging (guard held until exit)
//! 3. Load the project and auto bind controllers if enabled
//! 4. Start execution and spawn the loop task
//! 5. Wait for Ctrl+C, then shut the loop down and log metrics

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use simlink::{APP_NAME, Backends, ConfigManager, ExecutionManager, MessageBus, VERSION};

/// Headless engine that keeps simulator data and cockpit hardware in sync.
#[derive(Parser, Debug)]
#[command(name = "simlink", version, about)]
struct Cli {
    /// Directory holding simlink.yaml and the log directory
    #[arg(default_value = ".")]
    config_dir: Utf8PathBuf,

    /// Project snapshot to load at startup
    project: Option<Utf8PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let settings = config_manager.load_settings()?;

    // Keep the guard alive for the whole run, dropping it flushes the file writer
    let _log_guard = simlink::logging::setup_logging(&settings.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let bus = MessageBus::default();
    let manager = ExecutionManager::new(Backends::default(), bus, settings.execution.clone());

    if let Some(path) = cli.project {
        let project = config_manager.load_project(&path)?;
        manager
            .load_project(project)
            .context("Failed to load project into the engine")?;
    }

    manager.start();
    let loop_task = manager.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    tracing::info!("Interrupted, shutting down");
    manager.shutdown();

    if let Err(e) = loop_task.await {
        tracing::error!("Execution loop task failed: {}", e);
    }

    manager.metrics().log_summary();
    tracing::info!("Shutdown complete");
    Ok(())
}
