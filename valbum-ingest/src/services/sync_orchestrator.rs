//! Log sync orchestrator
//!
//! Coordinates one sync pass through its phases:
//!
//! 1. Discover raw VRChat log files
//! 2. Extract filtered lines (unreadable files are skipped with a warning;
//!    the client holds its newest log open for writing)
//! 3. Append the lines to the month-partitioned store
//! 4. Re-parse the store (all of it, or only partitions at/after the
//!    incremental watermark) and persist new records
//!
//! The append in step 3 always runs before the parse in step 4, so a record
//! only ever exists in the database if its line is durable in the store.
//! INCREMENTAL trusts the newest `joined_at` as a watermark; FULL re-reads
//! everything and exists for first runs and post-import repair.

use crate::models::{SyncMode, SyncOutcome};
use crate::services::line_extractor::{
    ExtractError, LineExtractor, RawLogLine, DEFAULT_INCLUDE_PATTERNS,
};
use crate::services::log_store::{LogStoreWriter, StoreError};
use crate::services::persister::{Persister, PersistError};
use chrono::{Datelike, NaiveDateTime};
use sqlx::SqlitePool;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};
use valbum_common::AppConfig;

/// Sync errors
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configured VRChat log directory does not exist
    #[error("VRChat log directory not found: {}", .0.display())]
    LogFileDirNotFound(PathBuf),

    /// Log directory exists but holds no client log files
    #[error("No VRChat log files found in {}", .0.display())]
    LogFilesNotFound(PathBuf),

    /// Store file read failure
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Store append or listing failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Record persistence failure
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// Watermark query failure
    #[error(transparent)]
    Common(#[from] valbum_common::Error),
}

/// Sync orchestrator service
pub struct SyncOrchestrator {
    config: AppConfig,
    db: SqlitePool,
    extractor: LineExtractor,
    store: LogStoreWriter,
    persister: Persister,
}

impl SyncOrchestrator {
    pub fn new(config: AppConfig, db: SqlitePool) -> Self {
        let store = LogStoreWriter::new(config.log_store_dir());
        let persister = Persister::new(db.clone());
        Self {
            config,
            db,
            extractor: LineExtractor::new(),
            store,
            persister,
        }
    }

    /// Run one sync pass.
    pub async fn sync_logs(&self, mode: SyncMode) -> Result<SyncOutcome, SyncError> {
        let raw_files = self.source_log_files()?;
        info!("Syncing {} VRChat log files ({:?})", raw_files.len(), mode);

        let lines = self.extract_raw(&raw_files);
        let appended = self.store.append(&lines)?;
        info!(
            "Appended {} lines across {} store files",
            appended.appended_lines,
            appended.store_file_paths.len()
        );

        let watermark = match mode {
            SyncMode::Full => None,
            SyncMode::Incremental => crate::db::world_joins::latest_joined_at(&self.db).await?,
        };
        let outcome = self.persist_store(watermark).await?;
        info!("Sync created {} records", outcome.total_created());
        Ok(outcome)
    }

    /// Re-parse the whole store without touching raw log files.
    ///
    /// Used after an import on a machine that has no VRChat installation:
    /// the imported store is the only line source there.
    pub async fn materialize_store(&self) -> Result<SyncOutcome, SyncError> {
        self.persist_store(None).await
    }

    /// Raw client log files in name order.
    ///
    /// The two error cases are distinct because their remedies differ: a
    /// missing directory needs configuration, an empty one just means VRChat
    /// has not run yet.
    fn source_log_files(&self) -> Result<Vec<PathBuf>, SyncError> {
        let dir = &self.config.vrchat_log_dir;
        if !dir.is_dir() {
            return Err(SyncError::LogFileDirNotFound(dir.clone()));
        }

        let entries = std::fs::read_dir(dir)
            .map_err(|_| SyncError::LogFileDirNotFound(dir.clone()))?;
        let mut files = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with("output_log_") && name.ends_with(".txt") {
                files.push(entry.path());
            }
        }
        if files.is_empty() {
            return Err(SyncError::LogFilesNotFound(dir.clone()));
        }
        files.sort();
        Ok(files)
    }

    /// Extract filtered lines from raw logs, skipping unreadable files.
    fn extract_raw(&self, files: &[PathBuf]) -> Vec<RawLogLine> {
        let mut lines = Vec::new();
        for file in files {
            match self.extractor.extract_file(file, DEFAULT_INCLUDE_PATTERNS) {
                Ok(mut file_lines) => lines.append(&mut file_lines),
                Err(e) => warn!("Skipping log file {}: {}", file.display(), e),
            }
        }
        lines
    }

    /// Parse store files and persist records, optionally only lines newer
    /// than the watermark.
    async fn persist_store(
        &self,
        watermark: Option<NaiveDateTime>,
    ) -> Result<SyncOutcome, SyncError> {
        let files = match watermark {
            Some(ts) => self.store.store_files_since(ts.year(), ts.month())?,
            None => self.store.store_files()?,
        };

        let mut lines = Vec::new();
        for file in &files {
            // Store files were filtered at append time, so no pattern filter here
            let mut file_lines = self.extractor.extract_file(file, &[])?;
            if let Some(ts) = watermark {
                file_lines.retain(|line| line.timestamp > ts);
            }
            lines.append(&mut file_lines);
        }

        Ok(self.persister.parse_and_persist(&lines).await?)
    }
}
