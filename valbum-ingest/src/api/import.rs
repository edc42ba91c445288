//! Log store import/export endpoints

use crate::models::{ExportOutcome, ImportBackupRecord};
use crate::services::ImportManager;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Build import/export routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/import", post(import_files))
        .route("/api/import/backups", get(list_backups))
        .route("/api/import/rollback", post(rollback))
        .route("/api/export", post(export_store))
}

/// Request body for POST /api/import
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// Files or folders to scan for log store files
    pub file_paths: Vec<String>,
}

/// Response body for POST /api/import
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub imported_data: serde_json::Value,
    pub backup: ImportBackupRecord,
}

/// Request body for POST /api/import/rollback
#[derive(Debug, Deserialize)]
pub struct RollbackRequest {
    pub backup_id: Uuid,
}

/// Request body for POST /api/export
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub target_dir: String,
}

/// Import external log store files into the local store and database
async fn import_files(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportResponse>> {
    let _guard = state
        .op_lock
        .try_lock()
        .map_err(|_| ApiError::Conflict("another sync or import is already running".to_string()))?;

    info!("Import requested: {} paths", request.file_paths.len());

    let paths: Vec<PathBuf> = request.file_paths.iter().map(PathBuf::from).collect();
    let manager = ImportManager::new(state.config.clone(), state.db.clone());
    let outcome = manager.import_log_store_files(&paths).await?;

    Ok(Json(ImportResponse {
        success: true,
        imported_data: json!({ "total_lines": outcome.total_lines }),
        backup: outcome.backup,
    }))
}

/// List import backup history, newest first
async fn list_backups(State(state): State<AppState>) -> ApiResult<Json<Vec<ImportBackupRecord>>> {
    let manager = ImportManager::new(state.config.clone(), state.db.clone());
    let history = manager.get_import_backup_history()?;
    Ok(Json(history))
}

/// Roll back the log store and database to a pre-import backup
async fn rollback(
    State(state): State<AppState>,
    Json(request): Json<RollbackRequest>,
) -> ApiResult<StatusCode> {
    let _guard = state
        .op_lock
        .try_lock()
        .map_err(|_| ApiError::Conflict("another sync or import is already running".to_string()))?;

    info!("Rollback requested: backup_id={}", request.backup_id);

    let manager = ImportManager::new(state.config.clone(), state.db.clone());
    manager.rollback_to_backup(request.backup_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Export the log store into a target folder
async fn export_store(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<Json<ExportOutcome>> {
    info!("Export requested: target={}", request.target_dir);

    let manager = ImportManager::new(state.config.clone(), state.db.clone());
    let outcome = manager.export_log_store(Path::new(&request.target_dir))?;

    Ok(Json(outcome))
}
