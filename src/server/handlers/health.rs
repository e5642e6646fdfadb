use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = Utc::now() - state.started_at;
    Json(json!({
        "status": "ok",
        "pipelines": state.pipelines.len(),
        "youtube_configured": state.youtube.is_configured(),
        "uptime_secs": uptime.num_seconds().max(0)
    }))
}
