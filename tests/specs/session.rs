// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive request specs: supervisor → tracker → dashboard.

use crate::helpers::stub_cli;
use gofer_adapters::FakeChatAdapter;
use gofer_core::{LiveStatus, SystemClock};
use gofer_supervisor::{SessionRequest, SessionSupervisor, SupervisorConfig};
use gofer_tracker::{DashboardState, ProgressTracker, TrackerConfig};
use std::sync::Arc;
use tokio::sync::mpsc;

struct Harness {
    supervisor: SessionSupervisor,
    tracker: ProgressTracker,
    dashboard: Arc<DashboardState>,
    chat: FakeChatAdapter,
}

/// Supervisor + tracker wired the way the daemon wires them, over a
/// stub CLI.
fn harness(dir: &tempfile::TempDir, stub_body: &str) -> Harness {
    let cli = stub_cli(dir, stub_body);
    let (updates_tx, mut updates_rx) = mpsc::channel(1_024);
    let supervisor = SessionSupervisor::new(
        SupervisorConfig {
            cli_path: cli.display().to_string(),
            ..SupervisorConfig::default()
        },
        updates_tx,
    );
    let dashboard = Arc::new(DashboardState::new(SystemClock));
    let chat = FakeChatAdapter::new();
    let tracker = ProgressTracker::new(
        TrackerConfig { heartbeat_interval_ms: 3_600_000, ..TrackerConfig::default() },
        Arc::clone(&dashboard),
        Arc::new(chat.clone()),
        SystemClock,
    );
    let pump = tracker.clone();
    tokio::spawn(async move {
        while let Some(update) = updates_rx.recv().await {
            pump.on_progress(update.request_id.as_str(), &update.chunk).await;
        }
    });
    Harness { supervisor, tracker, dashboard, chat }
}

#[tokio::test]
async fn hello_round_trip_resolves_and_completes_the_live_task() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        &dir,
        r#"cat >/dev/null
printf '%s\n' '{"type":"result","result":"hi"}'"#,
    );

    let request = SessionRequest::new("42", None, "hello");
    let task_id = request.request_id.clone();
    h.tracker.start_task(task_id.as_str(), "42", None, "hello");
    let output = h.supervisor.execute(request).await.unwrap();
    assert_eq!(output, "hi");
    h.tracker.end_task(task_id.as_str(), &output);

    let task = h.dashboard.get_task(task_id.as_str()).unwrap();
    assert_eq!(task.status, LiveStatus::Completed);
    assert_eq!(task.output.as_deref(), Some("hi"));
}

#[tokio::test]
async fn fifty_tool_events_collapse_to_at_most_one_message() {
    let dir = tempfile::tempdir().unwrap();
    // 50 tool_use events in a burst, then the final result.
    let h = harness(
        &dir,
        r#"cat >/dev/null
i=0
while [ $i -lt 50 ]; do
  printf '%s\n' '{"type":"contentBlockStart","contentBlock":{"type":"tool_use","name":"Bash"}}'
  i=$((i+1))
done
printf '%s\n' '{"type":"result","result":"done"}'"#,
    );

    let request = SessionRequest::new("42", None, "go");
    let task_id = request.request_id.clone();
    h.tracker.start_task(task_id.as_str(), "42", None, "go");
    let output = h.supervisor.execute(request).await.unwrap();
    assert_eq!(output, "done");

    // Give the progress pump a beat to drain.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let tool_messages: Vec<String> = h
        .chat
        .messages()
        .into_iter()
        .map(|message| message.text)
        .filter(|text| text.contains("**Tool**"))
        .collect();
    assert_eq!(tool_messages.len(), 1);
    assert_eq!(tool_messages[0], "🔧 **Tool**: **Bash**");
    h.tracker.end_task(task_id.as_str(), &output);
}

#[tokio::test]
async fn same_session_requests_execute_in_arrival_order() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("order.log");
    let h = harness(
        &dir,
        r#"read -r logfile
echo "start $$" >> "$logfile"
sleep 0.15
echo "end $$" >> "$logfile"
printf '%s\n' '{"type":"result","result":"ok"}'"#,
    );

    let prompt = log.display().to_string();
    let first = h.supervisor.execute(SessionRequest::new("7", None, prompt.clone()));
    let second = h.supervisor.execute(SessionRequest::new("7", None, prompt.clone()));
    let (a, b) = tokio::join!(first, second);
    a.unwrap();
    b.unwrap();

    let contents = std::fs::read_to_string(&log).unwrap();
    let kinds: Vec<&str> = contents
        .lines()
        .map(|line| line.split_whitespace().next().unwrap())
        .collect();
    assert_eq!(kinds, vec!["start", "end", "start", "end"]);
}
