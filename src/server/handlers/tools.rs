use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct YoutubeMetadataRequest {
    pub url: String,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub comments: bool,
    #[serde(default)]
    pub max_comments: Option<usize>,
}

/// Passes the tool's JSON text through untouched, errors included.
pub async fn youtube_metadata(
    State(state): State<Arc<AppState>>,
    Json(request): Json<YoutubeMetadataRequest>,
) -> impl IntoResponse {
    let options = state
        .youtube
        .options(request.lang.as_deref(), request.comments, request.max_comments);
    let output = state
        .youtube
        .extract_video_metadata(&request.url, &options)
        .await;
    ([(header::CONTENT_TYPE, "application/json")], output)
}
