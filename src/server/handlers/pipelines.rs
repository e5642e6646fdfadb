use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::config::service::{deep_merge, redact_sensitive_values, restore_redacted_values};
use crate::core::config::validation::validate_config;
use crate::core::errors::ApiError;
use crate::pipeline::{PipeRequest, Pipeline};
use crate::state::AppState;
use crate::tools::youtube::{TOOL_ID, TOOL_NAME};

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub body: Value,
    #[serde(default)]
    pub user: Option<Value>,
}

fn lookup(state: &AppState, pipeline_id: &str) -> Result<Arc<dyn Pipeline>, ApiError> {
    state
        .pipelines
        .get(pipeline_id)
        .ok_or_else(|| ApiError::NotFound(format!("pipeline `{}`", pipeline_id)))
}

pub async fn list_pipelines(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut data: Vec<Value> = state
        .pipelines
        .list()
        .map(|pipeline| {
            json!({
                "id": pipeline.id(),
                "name": pipeline.name(),
                "kind": "pipe"
            })
        })
        .collect();
    data.push(json!({
        "id": TOOL_ID,
        "name": TOOL_NAME,
        "kind": "tool"
    }));
    Json(json!({ "data": data }))
}

pub async fn pipe(
    State(state): State<Arc<AppState>>,
    Path(pipeline_id): Path<String>,
    Json(request): Json<PipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = lookup(&state, &pipeline_id)?;
    let response = pipeline.pipe(request).await;
    Ok(Json(json!({ "response": response })))
}

pub async fn inlet(
    State(state): State<Arc<AppState>>,
    Path(pipeline_id): Path<String>,
    Json(request): Json<FilterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = lookup(&state, &pipeline_id)?;
    Ok(Json(pipeline.inlet(request.body, request.user).await))
}

pub async fn outlet(
    State(state): State<Arc<AppState>>,
    Path(pipeline_id): Path<String>,
    Json(request): Json<FilterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = lookup(&state, &pipeline_id)?;
    Ok(Json(pipeline.outlet(request.body, request.user).await))
}

pub async fn get_valves(
    State(state): State<Arc<AppState>>,
    Path(pipeline_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = lookup(&state, &pipeline_id)?;
    Ok(Json(redact_sensitive_values(&pipeline.valves_json().await)))
}

/// Accepts a full or partial valves object. Redacted secrets keep their
/// current value. Out-of-range valves are rejected before anything is
/// applied; applied valves that cannot be saved are reported as a 500.
pub async fn update_valves(
    State(state): State<Arc<AppState>>,
    Path(pipeline_id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    if !payload.is_object() {
        return Err(ApiError::BadRequest("valves must be a JSON object".to_string()));
    }
    let pipeline = lookup(&state, &pipeline_id)?;

    let current = pipeline.valves_json().await;
    let restored = restore_redacted_values(&payload, &current);
    let merged = deep_merge(&current, &restored);
    let persisted = json!({ "pipelines": { (pipeline_id.as_str()): merged.clone() } });
    validate_config(&persisted)?;

    pipeline.update_valves(merged.clone()).await?;
    state
        .config_service
        .update_config(persisted, true)
        .map_err(|err| {
            tracing::error!("Valves for {} applied but not saved: {}", pipeline_id, err);
            ApiError::Internal(format!("valves applied but not saved: {}", err))
        })?;

    Ok(Json(redact_sensitive_values(&merged)))
}
