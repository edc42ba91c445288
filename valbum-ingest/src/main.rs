//! VAlbum Log Ingest (valbum-ingest) - Main entry point
//!
//! Resolves configuration, opens the SQLite database under the data
//! directory, and serves the ingest HTTP API on the configured port.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use valbum_common::AppConfig;
use valbum_ingest::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::resolve();

    init_logging(&config)?;

    info!("Starting VAlbum log ingest");
    info!("Data dir: {}", config.data_dir.display());
    info!("VRChat log dir: {}", config.vrchat_log_dir.display());

    config
        .ensure_data_dirs()
        .context("Failed to create data directories")?;

    let db = valbum_common::db::init_database(&config.database_path())
        .await
        .context("Failed to initialize database")?;
    info!("Database initialized: {}", config.database_path().display());

    let state = AppState::new(db, config.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    info!("valbum-ingest listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. When a log file is configured
/// the stream goes there instead of stderr, without ANSI colors.
fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match &config.logging.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}
