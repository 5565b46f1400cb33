//! OnAir Playout (onair-playout) - Main entry point
//!
//! Opens the database, seeds every channel's session from its schedule and
//! serves the query/command API until interrupted.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use onair_common::config::{BootstrapConfig, CliOverrides, ConfigResolver};
use onair_common::time::SystemClock;
use onair_playout::api::{self, AppContext};
use onair_playout::config::RuntimeSettings;
use onair_playout::db::SqliteStore;
use onair_playout::playback::HeadlessPlayerFactory;
use onair_playout::{PlayoutEngine, SharedState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "onair_playout=info,tower_http=info";

/// Command-line arguments for onair-playout
#[derive(Parser, Debug)]
#[command(name = "onair-playout")]
#[command(about = "Broadcast playout engine for OnAir channels")]
#[command(version)]
struct Args {
    /// Path to the SQLite database
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML bootstrap configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigResolver::new("onair-playout").resolve(&CliOverrides {
        database_path: args.database,
        port: args.port,
        config_file: args.config,
    });

    init_tracing(&config)?;

    info!(
        "Starting onair-playout v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Database: {}", config.database_path.display());

    let pool = onair_common::db::init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let settings = RuntimeSettings::load(&pool)
        .await
        .context("Failed to load runtime settings")?;

    let state = Arc::new(SharedState::new());
    let engine = Arc::new(PlayoutEngine::new(
        Arc::new(SqliteStore::new(pool.clone())),
        settings,
        Arc::new(SystemClock),
        Arc::new(HeadlessPlayerFactory),
        state,
    ));

    let opened = engine
        .start_all()
        .await
        .context("Failed to open channels")?;
    info!("Playout engine started with {} channels", opened);

    let ctx = AppContext::new(Arc::clone(&engine));
    api::run(config.port, ctx, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    engine.shutdown().await;
    pool.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// RUST_LOG wins over the TOML `[logging] level`; an optional log file
/// replaces stderr output
fn init_tracing(config: &BootstrapConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter(&config.logging.level)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);

    match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
    Ok(())
}

/// A bare level ("debug") applies to this crate and the HTTP layer; a
/// full directive string is used as given
fn config_filter(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("onair_playout={0},onair_common={0},tower_http={0}", level)
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
