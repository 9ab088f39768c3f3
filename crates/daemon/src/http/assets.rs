// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static asset serving for the browser dashboard.

use super::{ApiError, AppState};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::path::{Component, Path, PathBuf};

/// Router fallback: serve dashboard assets for unmatched GET paths,
/// 404 for everything else.
pub async fn serve_static(State(state): State<AppState>, request: Request) -> Response {
    if request.method() != Method::GET {
        return ApiError::NotFound("unknown route".to_string()).into_response();
    }
    let Some(root) = &state.static_root else {
        return ApiError::NotFound("unknown route".to_string()).into_response();
    };

    let requested = request.uri().path().trim_start_matches('/');
    let requested = if requested.is_empty() { "index.html" } else { requested };
    let Some(relative) = safe_relative_path(requested) else {
        return ApiError::NotFound("unknown route".to_string()).into_response();
    };

    let full = root.join(relative);
    match tokio::fs::read(&full).await {
        Ok(bytes) => {
            let mime = content_type(&full);
            ([(header::CONTENT_TYPE, HeaderValue::from_static(mime))], bytes).into_response()
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            StatusCode::NOT_FOUND.into_response()
        }
        Err(error) => {
            tracing::warn!(path = %full.display(), %error, "static asset read failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Normalize a request path, rejecting anything that could escape the
/// static root (absolute paths, `..`, drive prefixes).
fn safe_relative_path(requested: &str) -> Option<PathBuf> {
    let path = Path::new(requested);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!clean.as_os_str().is_empty()).then_some(clean)
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
#[path = "assets_tests.rs"]
mod tests;
