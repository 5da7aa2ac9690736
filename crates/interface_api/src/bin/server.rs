//! Meter Split - API Server Binary
//!
//! Starts the HTTP API over the shared-meter ledger.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin meter-split-api
//!
//! # Run with environment variables
//! METER_PORT=9000 METER_DATA_DIR=/var/lib/meter cargo run --bin meter-split-api
//! ```
//!
//! # Environment Variables
//!
//! * `METER_HOST` - Server host (default: 0.0.0.0)
//! * `METER_PORT` - Server port (default: 8080)
//! * `METER_DATA_DIR` - Directory for bills and settings (default: ./data)
//! * `METER_BACKUP_DIR` - Directory for backup documents (default: ./data/backups)
//! * `METER_STORAGE_QUOTA_BYTES` - Byte quota of the data directory (default: 5 MiB)
//! * `METER_MAX_UPLOAD_BYTES` - Largest accepted request body (default: 5 MiB)
//! * `METER_UNDO_DEPTH` - Deletions kept for undo (default: 10)
//! * `METER_UNDO_WINDOW_SECS` - Seconds an undo stays available (default: 10)
//! * `METER_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::SystemClock;
use domain_metering::Ledger;
use infra_store::{DirectoryBlobStore, FileStore};
use interface_api::{config::ApiConfig, create_router, AppState};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, opens the stores and starts
/// the HTTP server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = load_config();
    config.validate().context("invalid configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        data_dir = %config.data_dir,
        "Starting Meter Split API Server"
    );

    let store = FileStore::open(&config.data_dir, config.storage_quota_bytes)
        .with_context(|| format!("opening data directory {}", config.data_dir))?;
    let backups = DirectoryBlobStore::open(&config.backup_dir)
        .await
        .with_context(|| format!("opening backup directory {}", config.backup_dir))?;
    let ledger = Ledger::open(store, config.ledger_config(), Arc::new(SystemClock))
        .context("loading ledger")?;

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address {}", config.server_addr()))?;

    let app = create_router(AppState::new(ledger, backups, config));

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads configuration from `METER_*` variables, falling back to defaults
fn load_config() -> ApiConfig {
    ApiConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Invalid configuration ({}), using defaults", e);
        ApiConfig::default()
    })
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
