// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg(unix)]

use super::*;
use gofer_adapters::FakeChatAdapter;
use gofer_core::LiveStatus;
use tempfile::TempDir;

fn stub_cli(dir: &TempDir, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.path().join("fake-cli");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn options(dir: &TempDir) -> GatewayOptions {
    GatewayOptions {
        state_dir: dir.path().join("state"),
        http_addr: None,
        config_path: None,
    }
}

fn build_with_stub(dir: &TempDir, stub_body: &str) -> Gateway {
    let cli = stub_cli(dir, stub_body);
    let options = options(dir);
    std::fs::create_dir_all(&options.state_dir).unwrap();
    let config = GatewayConfig {
        cli_path: cli.display().to_string(),
        ..GatewayConfig::default()
    };
    ConfigFile::new(options.state_dir.join("gateway-config.json")).save(&config).unwrap();
    Gateway::build(options, Arc::new(FakeChatAdapter::new())).unwrap()
}

#[tokio::test]
async fn chat_request_round_trips_through_supervisor_and_tracker() {
    let dir = tempfile::tempdir().unwrap();
    let mut gateway = build_with_stub(
        &dir,
        r#"cat >/dev/null
printf '%s\n' '{"type":"result","result":"hi"}'"#,
    );
    gateway.start();

    let output = gateway.handle_chat_request("42", None, "hello").await.unwrap();
    assert_eq!(output, "hi");

    let tasks = gateway.app_state().dashboard.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, LiveStatus::Completed);
    assert_eq!(tasks[0].output.as_deref(), Some("hi"));
    assert_eq!(tasks[0].prompt, "hello");
}

#[tokio::test]
async fn failed_chat_request_lands_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut gateway = build_with_stub(&dir, "cat >/dev/null\nexit 9");
    gateway.start();

    let result = gateway.handle_chat_request("42", None, "hello").await;
    assert!(result.is_err());
    let tasks = gateway.app_state().dashboard.tasks();
    assert_eq!(tasks[0].status, LiveStatus::Error);
}

#[tokio::test]
async fn second_gateway_on_same_state_dir_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let _first = build_with_stub(&dir, "true");
    let result = Gateway::build(options(&dir), Arc::new(FakeChatAdapter::new()));
    assert!(result.is_err());
}

#[tokio::test]
async fn options_overrides_win_over_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = options(&dir);
    opts.http_addr = Some("127.0.0.1:9999".to_string());
    let gateway = Gateway::build(opts, Arc::new(FakeChatAdapter::new())).unwrap();
    assert_eq!(gateway.config().http_addr, "127.0.0.1:9999");
}
