// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST handlers.

use super::{ApiError, AppState};
use axum::extract::{Path, State};
use axum::Json;
use gofer_core::{JobId, JobUpdate, NewJob};
use serde_json::{json, Value};

/// `GET /api/stats` — dashboard counters plus static gateway info.
pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let mut value = serde_json::to_value(state.dashboard.stats())
        .map_err(|error| ApiError::Internal(error.to_string()))?;
    value["gateway"] = json!({
        "name": "gofer",
        "version": env!("CARGO_PKG_VERSION"),
    });
    Ok(Json(value))
}

/// `GET /api/tasks` — every live task, newest first.
pub async fn tasks(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "tasks": state.dashboard.tasks() }))
}

/// `GET /api/tasks/current` — running live tasks only.
pub async fn current_tasks(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "tasks": state.dashboard.running_tasks() }))
}

/// `POST /api/tasks/clear` — drop finished tasks from the dashboard.
pub async fn clear_tasks(State(state): State<AppState>) -> Json<Value> {
    let removed = state.dashboard.clear_finished();
    Json(json!({ "removed": removed }))
}

/// `GET /api/config`
pub async fn get_config(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let config = state.config_file.load()?;
    Ok(Json(serde_json::to_value(config).map_err(|error| {
        ApiError::Internal(error.to_string())
    })?))
}

/// `PUT /api/config` — shallow-merge the body into the document.
pub async fn put_config(
    State(state): State<AppState>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let merged = state.config_file.merge(patch)?;
    Ok(Json(serde_json::to_value(merged).map_err(|error| {
        ApiError::Internal(error.to_string())
    })?))
}

/// `POST /api/restart` — respond first, restart shortly after.
pub async fn restart(State(state): State<AppState>) -> Json<Value> {
    let restart = std::sync::Arc::clone(&state.restart);
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        tracing::warn!("restart requested via control plane");
        (restart.as_ref())();
    });
    Json(json!({ "restarting": true }))
}

/// `GET /api/scheduled-tasks`
pub async fn list_jobs(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "tasks": state.store.get_all() }))
}

/// `POST /api/scheduled-tasks`
pub async fn create_job(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let params: NewJob = serde_json::from_value(body)
        .map_err(|error| ApiError::BadRequest(format!("invalid job: {error}")))?;
    let job = state.store.create(params)?;
    Ok(Json(json!({ "task": job })))
}

/// `GET /api/scheduled-tasks/stats`
pub async fn job_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(serde_json::to_value(state.store.get_statistics()).map_err(
        |error| ApiError::Internal(error.to_string()),
    )?))
}

/// `GET /api/scheduled-tasks/{id}`
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let job = state
        .store
        .get(&JobId::from_string(&id))
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {id}")))?;
    Ok(Json(json!({ "task": job })))
}

/// `PUT /api/scheduled-tasks/{id}` — shallow-merge update.
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let update: JobUpdate = serde_json::from_value(body)
        .map_err(|error| ApiError::BadRequest(format!("invalid update: {error}")))?;
    let job = state.store.update(&JobId::from_string(&id), update)?;
    Ok(Json(json!({ "task": job })))
}

/// `DELETE /api/scheduled-tasks/{id}` — cancels in-flight work first.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.scheduler.delete_task(&JobId::from_string(&id))?;
    Ok(Json(json!({ "deleted": id })))
}

/// `POST /api/scheduled-tasks/{id}/pause`
pub async fn pause_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.scheduler.pause_task(&JobId::from_string(&id))?;
    Ok(Json(json!({ "paused": id })))
}

/// `POST /api/scheduled-tasks/{id}/resume`
pub async fn resume_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.scheduler.resume_task(&JobId::from_string(&id))?;
    Ok(Json(json!({ "resumed": id })))
}

/// `POST /api/scheduled-tasks/{id}/execute`
pub async fn execute_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.scheduler.execute_task_now(&JobId::from_string(&id))?;
    Ok(Json(json!({ "executing": id })))
}
