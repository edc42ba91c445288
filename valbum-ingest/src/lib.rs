//! VAlbum Log Ingest (valbum-ingest)
//!
//! VRChat log ingestion module. Extracts world join, player join/leave and
//! screenshot events from the VRChat output logs, persists them into SQLite
//! through an append-only log store, and serves session-grouped photo data
//! over HTTP.
//!
//! ## Features
//!
//! - Log line extraction and append-only log store with monthly partitions
//! - Full and incremental sync into the record tables
//! - Log store import/export with automatic pre-import backups and rollback
//! - Photo session grouping (photos attached to the preceding world join)

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use valbum_common::AppConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Resolved application configuration
    pub config: AppConfig,
    /// Serializes sync/import/rollback, which all rewrite shared files
    pub op_lock: Arc<Mutex<()>>,
    /// Service startup time (for uptime calculation)
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        Self {
            db,
            config,
            op_lock: Arc::new(Mutex::new(())),
            startup_time: Utc::now(),
        }
    }
}

/// Build the application router with all API routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health::routes())
        .merge(api::sync::routes())
        .merge(api::import::routes())
        .merge(api::sessions::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
