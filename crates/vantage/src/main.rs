//! Vantage - remote instrumentation terminal
//!
//! Runs a terminal with a demo workload so observers have something to look
//! at: two traced loops and a small config registry.
//!
//! # Usage
//!
//! ```bash
//! vantage
//! vantage --config configs/vantage.toml
//! vantage --port 0 --log-level debug
//! ```

mod demo;
mod shell;

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use vantage_config::{Config, LogConfig, LogFormat, LogOutput};
use vantage_terminal::{MemoryConfigStore, Terminal};
use vantage_trace::TraceRegistry;

/// Vantage - remote instrumentation terminal
#[derive(Parser, Debug)]
#[command(name = "vantage")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (error if specified but not found)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long)]
    log_level: Option<String>,

    /// Listen port. Overrides config file; 0 picks a free port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_logging(&config.log, cli.log_level.as_deref())?;

    let registry = TraceRegistry::new();
    let store = Arc::new(MemoryConfigStore::new());
    let terminal = Arc::new(
        Terminal::new(&config, registry.clone(), store.clone())
            .context("failed to create terminal")?,
    );
    terminal.launch().context("failed to launch terminal")?;

    let workload = demo::Workload::start(&registry, Arc::clone(&store))?;

    let running = Arc::new(AtomicBool::new(true));
    let commands = {
        let terminal = Arc::clone(&terminal);
        let running = Arc::clone(&running);
        let shell = shell::Shell::new(registry.clone(), store);
        tokio::task::spawn_blocking(move || shell.run(&terminal, &running))
    };

    info!(
        name = %config.session.name,
        address = %config.server.bind_address(),
        "vantage running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    running.store(false, Ordering::Relaxed);
    commands.await.context("command loop panicked")?;
    workload.stop();
    terminal.shutdown();

    Ok(())
}

/// Initialize the tracing subscriber for logging
fn init_logging(log: &LogConfig, cli_level: Option<&str>) -> Result<()> {
    let level = log.effective_level(cli_level);
    let filter = EnvFilter::try_new(level.as_str())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let writer = match &log.output {
        LogOutput::Stdout => BoxMakeWriter::new(io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(io::stderr),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    };

    let layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(writer);

    match log.format {
        LogFormat::Console => tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(layer.json())
            .with(filter)
            .init(),
    }

    Ok(())
}
