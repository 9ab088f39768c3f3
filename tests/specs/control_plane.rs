// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane specs over a fully built gateway.

use gofer_adapters::FakeChatAdapter;
use gofer_daemon::http::build_router;
use gofer_daemon::{ConfigFile, Gateway, GatewayConfig, GatewayOptions};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn gateway(dir: &TempDir) -> Gateway {
    let cli = crate::helpers::stub_cli(dir, "echo hi");
    let state_dir = dir.path().join("state");
    std::fs::create_dir_all(&state_dir).unwrap();
    let config = GatewayConfig {
        cli_path: cli.display().to_string(),
        ..GatewayConfig::default()
    };
    ConfigFile::new(state_dir.join("gateway-config.json")).save(&config).unwrap();
    let options = GatewayOptions { state_dir, http_addr: None, config_path: None };
    Gateway::build(options, Arc::new(FakeChatAdapter::new())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn scheduled_task_created_over_http_is_listed_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = gateway(&dir);
    let app = build_router(gateway.app_state().clone());

    let body = json!({
        "type": "periodic",
        "name": "x",
        "command": "true",
        "periodicConfig": { "interval": 1 }
    });
    let response = app
        .clone()
        .oneshot(
            axum::http::Request::post("/api/scheduled-tasks")
                .header("content-type", "application/json")
                .body(axum::body::Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let created = body_json(response).await;
    let id = created["task"]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            axum::http::Request::get("/api/scheduled-tasks")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed = body_json(response).await;
    assert!(listed["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .any(|task| task["id"] == id.as_str()));

    // The job also landed in the persistent store behind the API.
    assert!(gateway
        .app_state()
        .store
        .get(&gofer_core::JobId::from_string(&id))
        .is_some());
}

#[tokio::test]
async fn stats_surface_dashboard_counters() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = gateway(&dir);
    let app = build_router(gateway.app_state().clone());
    gateway
        .app_state()
        .dashboard
        .upsert_task(gofer_core::LiveTask::builder().id("req-x").build());

    let response = app
        .oneshot(axum::http::Request::get("/api/stats").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["runningTasks"], 1);
    assert_eq!(stats["gateway"]["name"], "gofer");
}
