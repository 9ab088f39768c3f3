// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gofer_adapters::FakeChatAdapter;
use gofer_core::FakeClock;

struct Fixture {
    tracker: ProgressTracker<FakeClock>,
    dashboard: Arc<DashboardState<FakeClock>>,
    chat: FakeChatAdapter,
    clock: FakeClock,
}

fn fixture() -> Fixture {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let dashboard = Arc::new(DashboardState::new(clock.clone()));
    let chat = FakeChatAdapter::new();
    let tracker = ProgressTracker::new(
        TrackerConfig {
            // Heartbeats only fire when the tests call them.
            heartbeat_interval_ms: 3_600_000,
            ..TrackerConfig::default()
        },
        Arc::clone(&dashboard),
        Arc::new(chat.clone()),
        clock.clone(),
    );
    Fixture { tracker, dashboard, chat, clock }
}

#[tokio::test]
async fn start_task_registers_a_running_live_task() {
    let f = fixture();
    f.tracker.start_task("req-1", "42", Some("777".to_string()), &"很长的提示".repeat(30));
    let task = f.dashboard.get_task("req-1").unwrap();
    assert_eq!(task.status, LiveStatus::Running);
    assert_eq!(task.user_id, "42");
    assert_eq!(task.group_id.as_deref(), Some("777"));
    assert_eq!(task.prompt.chars().count(), 50);
    assert_eq!(f.dashboard.stats().running_tasks, 1);
    f.tracker.end_task("req-1", "done");
}

#[tokio::test]
async fn milestone_floods_collapse_to_one_send() {
    let f = fixture();
    f.tracker.start_task("req-1", "42", None, "go");

    // 100 milestone chunks inside the window: exactly one forward.
    for n in 0..100 {
        f.tracker.on_progress("req-1", &format!("Using Bash tool ({n})")).await;
        f.clock.advance_ms(5);
    }
    assert_eq!(f.chat.messages().len(), 1);
    assert_eq!(f.chat.messages()[0].text, "🔧 **Tool**: **Bash**");

    // The first milestone after the window fires exactly one more.
    f.clock.advance_ms(2_000);
    f.tracker.on_progress("req-1", "Using Grep tool").await;
    assert_eq!(f.chat.messages().len(), 2);
    assert_eq!(f.chat.messages()[1].text, "🔧 **Tool**: **Grep**");
    f.tracker.end_task("req-1", "done");
}

#[tokio::test]
async fn throttled_milestones_are_still_recorded() {
    let f = fixture();
    f.tracker.start_task("req-1", "42", None, "go");
    for _ in 0..5 {
        f.tracker.on_progress("req-1", "Reading src/lib.rs").await;
    }
    let task = f.dashboard.get_task("req-1").unwrap();
    assert_eq!(task.milestones.len(), 5);
    assert_eq!(f.chat.messages().len(), 1);
    assert_eq!(f.tracker.last_milestone("req-1").as_deref(), Some("Reading src/lib.rs"));
    f.tracker.end_task("req-1", "done");
}

#[tokio::test]
async fn updates_are_buffered_but_never_forwarded() {
    let f = fixture();
    f.tracker.start_task("req-1", "42", None, "go");
    f.tracker.on_progress("req-1", "just some prose\nmore prose").await;
    assert!(f.chat.messages().is_empty());

    let flushed = f.tracker.flush_buffer("req-1").unwrap();
    assert_eq!(flushed, "ℹ️ just some prose\nℹ️ more prose");
    f.tracker.end_task("req-1", "done");
}

#[tokio::test]
async fn error_lines_outrank_and_format_as_errors() {
    let f = fixture();
    f.tracker.start_task("req-1", "42", None, "go");
    f.tracker.on_progress("req-1", "Error: connection refused").await;
    assert_eq!(f.chat.messages()[0].text, "❌ **Error**: Error: connection refused");
    let task = f.dashboard.get_task("req-1").unwrap();
    assert_eq!(task.milestones[0].kind, MilestoneKind::Error);
    f.tracker.end_task("req-1", "done");
}

#[tokio::test]
async fn heartbeat_is_suppressed_after_a_recent_smart_send() {
    let f = fixture();
    f.tracker.start_task("req-1", "42", None, "go");
    f.tracker.on_progress("req-1", "Using Bash tool").await;
    assert_eq!(f.chat.messages().len(), 1);

    // Within the 5s suppression window: silent.
    f.clock.advance_ms(3_000);
    assert!(!f.tracker.heartbeat_tick("req-1").await);
    assert_eq!(f.chat.messages().len(), 1);

    // Past the window: the spinner line goes out.
    f.clock.advance_ms(2_000);
    assert!(f.tracker.heartbeat_tick("req-1").await);
    let text = &f.chat.messages()[1].text;
    assert!(text.contains("任务执行中..."), "unexpected heartbeat line: {text}");
    assert!(text.contains("5s"));
    f.tracker.end_task("req-1", "done");
}

#[tokio::test]
async fn spinner_frames_cycle_in_order() {
    let f = fixture();
    f.tracker.start_task("req-1", "42", None, "go");
    for expected in SPINNER_FRAMES.iter().take(3) {
        f.clock.advance_ms(60_000);
        assert!(f.tracker.heartbeat_tick("req-1").await);
        let text = f.chat.messages().last().unwrap().text.clone();
        assert!(text.starts_with(expected), "expected frame {expected} in {text}");
    }
    f.tracker.end_task("req-1", "done");
}

#[tokio::test]
async fn heartbeat_for_finished_task_is_silent() {
    let f = fixture();
    f.tracker.start_task("req-1", "42", None, "go");
    f.tracker.end_task("req-1", "done");
    assert!(!f.tracker.heartbeat_tick("req-1").await);
    assert!(f.chat.messages().is_empty());
}

#[tokio::test]
async fn end_task_fixes_dashboard_state_and_stats() {
    let f = fixture();
    f.tracker.start_task("req-1", "42", None, "go");
    f.clock.advance_ms(7_500);
    f.tracker.end_task("req-1", "all done");

    let task = f.dashboard.get_task("req-1").unwrap();
    assert_eq!(task.status, LiveStatus::Completed);
    assert_eq!(task.output.as_deref(), Some("all done"));
    assert_eq!(task.elapsed, 7_500);
    let stats = f.dashboard.stats();
    assert_eq!(stats.running_tasks, 0);
    assert_eq!(stats.completed_tasks, 1);
}

#[tokio::test]
async fn fail_task_marks_error() {
    let f = fixture();
    f.tracker.start_task("req-1", "42", None, "go");
    f.tracker.fail_task("req-1", "timeout");
    let task = f.dashboard.get_task("req-1").unwrap();
    assert_eq!(task.status, LiveStatus::Error);
    assert_eq!(task.output.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn new_task_on_same_session_cancels_prior_heartbeat() {
    let f = fixture();
    f.tracker.start_task("req-1", "42", None, "first");
    f.tracker.start_task("req-2", "42", None, "second");

    // The displaced task lost its timer, so the reaper treats it as an
    // orphan; the new task keeps its timer and survives.
    assert_eq!(f.tracker.cleanup_zombie_tasks(), 1);
    assert_eq!(f.dashboard.get_task("req-1").unwrap().status, LiveStatus::Error);
    assert_eq!(f.dashboard.get_task("req-2").unwrap().status, LiveStatus::Running);
    f.tracker.end_task("req-2", "done");
}

#[tokio::test]
async fn orphan_reaper_heals_snapshot_restored_tasks_only() {
    let f = fixture();
    // Restored from a snapshot: running on the dashboard, no tracker state.
    f.dashboard.upsert_task(LiveTask::builder().id("req-old").build());
    // Live task with an armed timer.
    f.tracker.start_task("req-new", "42", None, "go");
    f.clock.advance_ms(10 * 60 * 1000);

    assert_eq!(f.tracker.cleanup_zombie_tasks(), 1);
    let reaped = f.dashboard.get_task("req-old").unwrap();
    assert_eq!(reaped.status, LiveStatus::Error);
    assert_eq!(reaped.output.as_deref(), Some("process terminated without heartbeat"));

    // Age alone is not a signal: the live task is untouched.
    assert_eq!(f.dashboard.get_task("req-new").unwrap().status, LiveStatus::Running);
    assert_eq!(f.tracker.cleanup_zombie_tasks(), 0);
    f.tracker.end_task("req-new", "done");
}

#[tokio::test]
async fn flush_buffer_dedupes_and_is_bounded() {
    let f = fixture();
    f.tracker.start_task("req-1", "42", None, "go");
    f.tracker.on_progress("req-1", "Reading a.rs\nReading a.rs\nplain").await;
    let flushed = f.tracker.flush_buffer("req-1").unwrap();
    assert_eq!(flushed, "🔸 Reading a.rs\nℹ️ plain");
    // A second flush has nothing left.
    assert!(f.tracker.flush_buffer("req-1").is_none());
    f.tracker.end_task("req-1", "done");
}
