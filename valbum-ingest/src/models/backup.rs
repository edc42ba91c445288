//! Import backup metadata
//!
//! One [`ImportBackupRecord`] describes one pre-import snapshot. The record
//! lives as `metadata.json` inside its backup folder rather than in the
//! database: the snapshot is taken before any mutation, and a rollback
//! restores database content, which would erase a database-resident record
//! before its status could flip to `RolledBack`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Lifecycle of a backup snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    /// Import completed; snapshot available for rollback
    Completed,
    /// Snapshot has been restored; not available for another rollback
    RolledBack,
}

/// Metadata for one pre-import snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBackupRecord {
    /// Unique backup identifier
    pub id: Uuid,

    /// Folder the snapshot lives in
    pub export_folder_path: PathBuf,

    /// Validated source files the import merged
    pub source_files: Vec<String>,

    /// When the snapshot was taken
    pub backup_timestamp: DateTime<Utc>,

    /// When the import finished
    pub import_timestamp: DateTime<Utc>,

    /// Lines appended to the log store by the import
    pub total_log_lines: u64,

    /// Files captured in the snapshot, relative to the backup folder
    pub exported_files: Vec<String>,

    /// Whether this backup can still be rolled back
    pub status: BackupStatus,
}

/// Result of one import
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    /// Lines appended to the log store
    pub total_lines: u64,

    /// The backup taken before the store was touched
    pub backup: ImportBackupRecord,
}

/// Result of one export
#[derive(Debug, Clone, Serialize)]
pub struct ExportOutcome {
    /// Files written under the target directory
    pub exported_files: Vec<String>,

    /// Total log lines across the exported files
    pub total_lines: u64,
}
