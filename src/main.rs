//! UniSat Floor Monitor - Entry Point
//!
//! Wiring sequence:
//! 1. Parse CLI flags and load + validate the config file
//! 2. Init tracing (plain or JSON stdout, optional log file)
//! 3. Create the metrics registry, spawn the metrics server if enabled
//! 4. Create the UniSat poll client and the Discord notifier
//! 5. Run one monitor loop per collection until SIGINT/SIGTERM
//!    or until every loop has ended
//! 6. Broadcast shutdown, wait for in-flight iterations, exit

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use unisat_floor_monitor::adapters::api::{UnisatClient, UnisatClientConfig};
use unisat_floor_monitor::adapters::metrics::MetricsRegistry;
use unisat_floor_monitor::adapters::webhook::DiscordNotifier;
use unisat_floor_monitor::config::{LoggingConfig, loader};
use unisat_floor_monitor::usecases::{Supervisor, failed_ticks};

/// Watches UniSat marketplace floors and posts discounted listings to webhooks.
#[derive(Parser, Debug)]
#[command(name = "unisat-floor-monitor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (.json or .toml)
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Load configuration ───────────────────────────────
    let settings = Arc::new(
        loader::load_settings(&cli.config)
            .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?,
    );

    // ── 2. Initialize logging ───────────────────────────────
    let log_file = init_tracing(&settings.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        protocol = %settings.protocol,
        collections = ?settings.collections,
        webhooks = settings.webhooks.len(),
        delay_ms = u64::try_from(settings.delay.as_millis()).unwrap_or(u64::MAX),
        max_retries = settings.max_retries,
        "Starting UniSat floor monitor"
    );
    if let Some(path) = log_file {
        info!(path = %path.display(), "Writing logs to file");
    }

    // ── 3. Shutdown channel and metrics ─────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);

    let metrics_handle = if settings.metrics.enabled {
        let server = Arc::clone(&metrics);
        let bind_address = settings.metrics.bind_address.clone();
        let metrics_shutdown = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.serve(bind_address, metrics_shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }))
    } else {
        None
    };

    // ── 4. Adapters ─────────────────────────────────────────
    let poller = Arc::new(
        UnisatClient::new(UnisatClientConfig::from(settings.as_ref()))
            .context("Failed to create UniSat client")?,
    );
    let notifier = Arc::new(DiscordNotifier::new());

    // ── 5. Run all collection loops ─────────────────────────
    let supervisor = Supervisor::new(
        Arc::clone(&settings),
        poller,
        notifier,
        Arc::clone(&metrics),
        shutdown_tx.clone(),
    );
    let reports = supervisor.run_until(shutdown_signal()).await;

    // ── 6. Graceful shutdown ────────────────────────────────
    let _ = shutdown_tx.send(());

    let failed = failed_ticks(&reports);
    if !failed.is_empty() {
        error!(
            failed = ?failed,
            total = reports.len(),
            "Some collections stopped on errors"
        );
    }

    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("SIGINT received"),
        () = terminate => info!("SIGTERM received"),
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level. When a log directory is
/// configured, a plain-text copy goes to `<dir>/<dd-mm-YYYY_HH-MM>.log`
/// and its path is returned.
fn init_tracing(logging: &LoggingConfig) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let (file_layer, file_path) = match &logging.directory {
        Some(dir) => {
            let (file, path) = open_log_file(Path::new(dir))?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    let plain_layer = (!logging.json).then(fmt::layer);
    let json_layer = logging.json.then(|| fmt::layer().json());

    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(file_path)
}

fn open_log_file(dir: &Path) -> Result<(File, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let name = chrono::Local::now().format("%d-%m-%Y_%H-%M.log").to_string();
    let path = dir.join(name);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    Ok((file, path))
}
