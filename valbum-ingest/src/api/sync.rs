//! Log sync endpoint

use crate::models::{SyncMode, SyncOutcome};
use crate::services::SyncOrchestrator;
use crate::{ApiError, ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::info;

/// Build sync routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/sync", post(sync_logs))
}

/// Request body for POST /api/sync
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    /// FULL re-reads the whole log store, INCREMENTAL only lines past the watermark
    pub mode: SyncMode,
}

/// Run a log sync in the requested mode
async fn sync_logs(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> ApiResult<Json<SyncOutcome>> {
    let _guard = state
        .op_lock
        .try_lock()
        .map_err(|_| ApiError::Conflict("another sync or import is already running".to_string()))?;

    info!("Sync requested: mode={:?}", request.mode);

    let orchestrator = SyncOrchestrator::new(state.config.clone(), state.db.clone());
    let outcome = orchestrator.sync_logs(request.mode).await?;

    info!("Sync finished: {} records created", outcome.total_created());
    Ok(Json(outcome))
}
