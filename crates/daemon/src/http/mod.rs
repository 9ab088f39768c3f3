// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP/SSE control plane over the dashboard state and the scheduler.
//!
//! Routing is exact method+path; unknown routes fall through to the
//! static-asset handler. CORS is wide open (`*`) — the control plane is
//! a development surface, not an authenticated API.

mod api;
mod assets;
mod sse;

use crate::config::{ConfigError, ConfigFile};
use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gofer_engine::{Scheduler, SchedulerError};
use gofer_storage::{StoreError, TaskStore};
use gofer_tracker::DashboardState;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    pub store: Arc<TaskStore>,
    pub dashboard: Arc<DashboardState>,
    pub config_file: ConfigFile,
    /// Invoked by `POST /api/restart` after the response is written.
    pub restart: Arc<dyn Fn() + Send + Sync>,
    /// Daemon log file tailed by the SSE endpoint.
    pub log_path: Option<PathBuf>,
    /// Root for dashboard static assets.
    pub static_root: Option<PathBuf>,
}

/// Errors surfaced as HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "control plane handler failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => ApiError::NotFound(format!("job not found: {id}")),
            StoreError::InvalidConfig(error) => ApiError::BadRequest(error.to_string()),
            StoreError::Persist(error) => ApiError::Internal(error.to_string()),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(error: SchedulerError) -> Self {
        match error {
            SchedulerError::NotFound(id) => ApiError::NotFound(format!("job not found: {id}")),
            SchedulerError::Store(error) => error.into(),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Io { .. } => ApiError::Internal(error.to_string()),
            _ => ApiError::BadRequest(error.to_string()),
        }
    }
}

/// Build the full control-plane router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/stats", get(api::stats))
        .route("/api/tasks", get(api::tasks))
        .route("/api/tasks/current", get(api::current_tasks))
        .route("/api/tasks/clear", post(api::clear_tasks))
        .route("/api/config", get(api::get_config).put(api::put_config))
        .route("/api/restart", post(api::restart))
        .route(
            "/api/scheduled-tasks",
            get(api::list_jobs).post(api::create_job),
        )
        .route("/api/scheduled-tasks/stats", get(api::job_stats))
        .route(
            "/api/scheduled-tasks/{id}",
            get(api::get_job).put(api::update_job).delete(api::delete_job),
        )
        .route("/api/scheduled-tasks/{id}/pause", post(api::pause_job))
        .route("/api/scheduled-tasks/{id}/resume", post(api::resume_job))
        .route("/api/scheduled-tasks/{id}/execute", post(api::execute_job))
        .route("/api/logs/stream", get(sse::stream_logs))
        .fallback(assets::serve_static)
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

/// Permissive CORS for the browser dashboard; preflights short-circuit
/// with an empty 200.
async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        apply_cors_headers(&mut response);
        return response;
    }
    let mut response = next.run(request).await;
    apply_cors_headers(&mut response);
    response
}

fn apply_cors_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
