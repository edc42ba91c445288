//! Photo session endpoint

use crate::db::{photos, world_joins};
use crate::models::SessionGroup;
use crate::services::session_correlator;
use crate::{ApiResult, AppState};
use axum::{extract::State, routing::get, Json, Router};

/// Build session routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/sessions", get(list_sessions))
}

/// Photos grouped under the world sessions they were taken in, newest first
async fn list_sessions(State(state): State<AppState>) -> ApiResult<Json<Vec<SessionGroup>>> {
    let joins = world_joins::list_all_desc(&state.db).await?;
    let all_photos = photos::list_all(&state.db).await?;

    let groups = session_correlator::correlate(all_photos, joins);
    Ok(Json(groups))
}
