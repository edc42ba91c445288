//! Log store import, backup, rollback, and export
//!
//! Import follows a strict order: validate sources, snapshot the current
//! state, merge, re-sync. The snapshot always exists before the first
//! mutation, so any import can be undone.
//!
//! A snapshot folder holds a verbatim copy of the log store, a `VACUUM INTO`
//! copy of the database, and a `metadata.json` describing the backup. The
//! metadata lives next to the snapshot rather than in the database on
//! purpose: rollback restores database content, which would erase a
//! database-resident record before its status could flip to rolled back.

use crate::models::{
    BackupStatus, ExportOutcome, ImportBackupRecord, ImportOutcome, SyncMode,
};
use crate::services::line_extractor::{parse_leading_timestamp, ExtractError, LineExtractor};
use crate::services::log_store::{LogStoreWriter, StoreError};
use crate::services::sync_orchestrator::{SyncError, SyncOrchestrator};
use chrono::Utc;
use sqlx::{Connection, SqliteConnection, SqlitePool};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use valbum_common::AppConfig;
use walkdir::WalkDir;

/// Tables owned by the record store, restored together on rollback.
const RECORD_TABLES: &[&str] = &[
    "world_join_logs",
    "player_join_logs",
    "player_leave_logs",
    "vrchat_photos",
];

/// Name of the metadata file inside each backup folder.
const METADATA_FILE: &str = "metadata.json";

/// Import errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// None of the requested paths contained a usable store file
    #[error("No valid log store source found")]
    NoValidSource,

    /// Snapshot creation failure; nothing was mutated
    #[error("Backup failed: {0}")]
    Backup(String),

    /// Source file vanished or became unreadable mid-import
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Store merge failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Post-merge re-sync failure
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Filesystem failure outside the snapshot step
    #[error("Import I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rollback errors
#[derive(Debug, Error)]
pub enum RollbackError {
    /// No completed backup with the requested id
    #[error("バックアップが見つかりません")]
    NotFound,

    /// Snapshot file restore failure
    #[error("Rollback I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database content restore failure
    #[error("Rollback database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backup bookkeeping failure
    #[error("Rollback failed: {0}")]
    Restore(String),
}

/// Import/backup manager service
pub struct ImportManager {
    config: AppConfig,
    db: SqlitePool,
    extractor: LineExtractor,
    store: LogStoreWriter,
    sync: SyncOrchestrator,
}

impl ImportManager {
    pub fn new(config: AppConfig, db: SqlitePool) -> Self {
        let store = LogStoreWriter::new(config.log_store_dir());
        let sync = SyncOrchestrator::new(config.clone(), db.clone());
        Self {
            config,
            db,
            extractor: LineExtractor::new(),
            store,
            sync,
        }
    }

    /// Import store files or directories of store files.
    ///
    /// Validation happens before the snapshot: a request that carries nothing
    /// usable fails without leaving an empty backup behind.
    pub async fn import_log_store_files(
        &self,
        paths: &[PathBuf],
    ) -> Result<ImportOutcome, ImportError> {
        let sources = self.collect_valid_sources(paths);
        if sources.is_empty() {
            return Err(ImportError::NoValidSource);
        }
        info!("Importing {} validated store files", sources.len());

        let mut backup = self.create_backup(&sources).await?;

        // Merge: append every line into the month partitions of the store
        let lines = self.extractor.extract(&sources, &[])?;
        let appended = self.store.append(&lines)?;
        info!("Merged {} lines into the log store", appended.appended_lines);

        // Re-sync FULL: imported lines may predate the incremental watermark
        match self.sync.sync_logs(SyncMode::Full).await {
            Ok(_) => {}
            Err(SyncError::LogFileDirNotFound(_)) | Err(SyncError::LogFilesNotFound(_)) => {
                // No VRChat installation here; the imported store is the
                // only line source
                warn!("No raw VRChat logs found, materializing imported store only");
                self.sync.materialize_store().await?;
            }
            Err(e) => return Err(e.into()),
        }

        backup.total_log_lines = appended.appended_lines as u64;
        backup.import_timestamp = Utc::now();
        self.write_metadata(&backup)?;

        Ok(ImportOutcome {
            total_lines: backup.total_log_lines,
            backup,
        })
    }

    /// Expand the requested paths into validated store files.
    ///
    /// Directories are searched for `logStore-*.txt` files. A file is valid
    /// when its first non-blank line starts with a log timestamp; anything
    /// else is skipped with a warning.
    fn collect_valid_sources(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        for path in paths {
            if path.is_dir() {
                for entry in WalkDir::new(path).into_iter().flatten() {
                    if entry.file_type().is_file() && is_store_file_name(entry.path()) {
                        candidates.push(entry.path().to_path_buf());
                    }
                }
            } else if path.is_file() {
                candidates.push(path.clone());
            } else {
                warn!("Import source does not exist: {}", path.display());
            }
        }
        candidates.sort();
        candidates.dedup();

        candidates
            .into_iter()
            .filter(|path| match is_valid_store_file(path) {
                Ok(true) => true,
                Ok(false) => {
                    warn!("Skipping non-store file: {}", path.display());
                    false
                }
                Err(e) => {
                    warn!("Skipping unreadable import source {}: {}", path.display(), e);
                    false
                }
            })
            .collect()
    }

    /// Snapshot the log store and database into a new backup folder.
    async fn create_backup(
        &self,
        source_files: &[PathBuf],
    ) -> Result<ImportBackupRecord, ImportError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let folder = self.config.backups_dir().join(format!(
            "backup-{}-{}",
            now.format("%Y%m%d-%H%M%S"),
            &id.simple().to_string()[..8]
        ));
        std::fs::create_dir_all(&folder)
            .map_err(|e| ImportError::Backup(format!("cannot create {}: {}", folder.display(), e)))?;

        // Verbatim copy of the store tree (may be absent on a first import)
        let mut exported_files = Vec::new();
        let store_dir = self.config.log_store_dir();
        if store_dir.is_dir() {
            exported_files = copy_dir_recursive(&store_dir, &folder.join("logStore"), "logStore")
                .map_err(|e| ImportError::Backup(format!("store snapshot failed: {}", e)))?;
        }

        // Consistent point-in-time database copy
        let db_snapshot = folder.join(database_file_name(&self.config));
        sqlx::query("VACUUM INTO ?")
            .bind(db_snapshot.to_string_lossy().into_owned())
            .execute(&self.db)
            .await
            .map_err(|e| ImportError::Backup(format!("database snapshot failed: {}", e)))?;
        exported_files.push(database_file_name(&self.config));

        let record = ImportBackupRecord {
            id,
            export_folder_path: folder,
            source_files: source_files
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            backup_timestamp: now,
            import_timestamp: now,
            total_log_lines: 0,
            exported_files,
            status: BackupStatus::Completed,
        };
        self.write_metadata(&record)?;
        info!("Created backup {} at {}", record.id, record.export_folder_path.display());
        Ok(record)
    }

    fn write_metadata(&self, record: &ImportBackupRecord) -> Result<(), ImportError> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| ImportError::Backup(format!("metadata serialization failed: {}", e)))?;
        std::fs::write(record.export_folder_path.join(METADATA_FILE), json)
            .map_err(|e| ImportError::Backup(format!("metadata write failed: {}", e)))?;
        Ok(())
    }

    /// All known backups, newest first. Folders without readable metadata
    /// are skipped with a warning.
    pub fn get_import_backup_history(&self) -> Result<Vec<ImportBackupRecord>, ImportError> {
        let entries = match std::fs::read_dir(self.config.backups_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let metadata_path = entry.path().join(METADATA_FILE);
            if !metadata_path.is_file() {
                continue;
            }
            match read_metadata(&metadata_path) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping backup folder {}: {}", entry.path().display(), e),
            }
        }
        records.sort_by(|a, b| b.backup_timestamp.cmp(&a.backup_timestamp));
        Ok(records)
    }

    /// Restore the log store and database content from a completed backup.
    ///
    /// A backup rolls back at most once: the restore flips its status, and
    /// only `completed` backups are eligible.
    pub async fn rollback_to_backup(&self, backup_id: Uuid) -> Result<(), RollbackError> {
        let mut record = self
            .get_import_backup_history()
            .map_err(|e| RollbackError::Restore(format!("backup history unavailable: {}", e)))?
            .into_iter()
            .find(|r| r.id == backup_id && r.status == BackupStatus::Completed)
            .ok_or(RollbackError::NotFound)?;

        info!("Rolling back to backup {}", record.id);

        // Store tree back to its snapshot state
        let store_dir = self.config.log_store_dir();
        if store_dir.exists() {
            std::fs::remove_dir_all(&store_dir)?;
        }
        let snapshot_store = record.export_folder_path.join("logStore");
        if snapshot_store.is_dir() {
            copy_dir_recursive(&snapshot_store, &store_dir, "logStore")?;
        } else {
            std::fs::create_dir_all(&store_dir)?;
        }

        // Database content back to its snapshot state
        let db_snapshot = record.export_folder_path.join(database_file_name(&self.config));
        self.restore_database(&db_snapshot).await?;

        record.status = BackupStatus::RolledBack;
        self.write_metadata(&record)
            .map_err(|e| RollbackError::Restore(e.to_string()))?;
        info!("Rollback of backup {} complete", record.id);
        Ok(())
    }

    /// Replace record table content with the snapshot's, through the live
    /// pool. The database file itself is never swapped out from under open
    /// connections.
    async fn restore_database(&self, snapshot: &Path) -> Result<(), RollbackError> {
        let mut conn = self.db.acquire().await?;

        sqlx::query("ATTACH DATABASE ? AS snapshot")
            .bind(snapshot.to_string_lossy().into_owned())
            .execute(&mut *conn)
            .await?;

        let restore = restore_record_tables(&mut conn).await;

        // Detach even when the restore failed
        let detach = sqlx::query("DETACH DATABASE snapshot")
            .execute(&mut *conn)
            .await;

        restore?;
        detach?;
        Ok(())
    }

    /// Copy the whole log store under `target/logStore`.
    pub fn export_log_store(&self, target: &Path) -> Result<ExportOutcome, ImportError> {
        let files = self.store.store_files()?;
        let store_dir = self.config.log_store_dir();

        let mut exported_files = Vec::new();
        let mut total_lines: u64 = 0;
        for file in &files {
            let relative = file.strip_prefix(&store_dir).unwrap_or(file);
            let dest = target.join("logStore").join(relative);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(file, &dest)?;

            let content = std::fs::read_to_string(file)?;
            total_lines += content.lines().count() as u64;
            exported_files.push(
                Path::new("logStore")
                    .join(relative)
                    .to_string_lossy()
                    .into_owned(),
            );
        }

        info!("Exported {} store files to {}", exported_files.len(), target.display());
        Ok(ExportOutcome {
            exported_files,
            total_lines,
        })
    }
}

/// Swap every record table's content for the snapshot's, atomically.
async fn restore_record_tables(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let mut tx = conn.begin().await?;
    for table in RECORD_TABLES {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "INSERT INTO {} SELECT * FROM snapshot.{}",
            table, table
        ))
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

fn database_file_name(config: &AppConfig) -> String {
    config
        .database_path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "valbum.db".to_string())
}

fn is_store_file_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("logStore-") && n.ends_with(".txt"))
        .unwrap_or(false)
}

/// A valid store source starts with a timestamped line.
fn is_valid_store_file(path: &Path) -> std::io::Result<bool> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(content
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| parse_leading_timestamp(line).is_some())
        .unwrap_or(false))
}

fn read_metadata(path: &Path) -> std::io::Result<ImportBackupRecord> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::other)
}

/// Copy a directory tree, returning copied paths prefixed with `prefix`.
fn copy_dir_recursive(src: &Path, dst: &Path, prefix: &str) -> std::io::Result<Vec<String>> {
    let mut copied = Vec::new();
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let dest = dst.join(relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(entry.path(), &dest)?;
        copied.push(Path::new(prefix).join(relative).to_string_lossy().into_owned());
    }
    Ok(copied)
}
