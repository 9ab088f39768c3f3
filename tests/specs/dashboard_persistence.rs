// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dashboard crash-safety specs: snapshot, backup fallback, reaping.

use gofer_core::{LiveStatus, LiveTask, SystemClock};
use gofer_storage::SnapshotStore;
use gofer_tracker::DashboardState;
use std::sync::Arc;

fn populated_state() -> Arc<DashboardState> {
    let state = Arc::new(DashboardState::new(SystemClock));
    for n in 0..3 {
        state.upsert_task(LiveTask::builder().id(format!("run-{n}")).build());
    }
    for n in 0..2 {
        let mut task = LiveTask::builder().id(format!("done-{n}")).build();
        task.finish(LiveStatus::Completed, Some("ok".to_string()), 2_000_000);
        state.upsert_task(task);
    }
    state
}

#[test]
fn restart_restores_three_running_and_two_completed() {
    let dir = tempfile::tempdir().unwrap();
    let snapshots = SnapshotStore::new(dir.path().join("dashboard-state.json"));
    let state = populated_state();
    snapshots.save(&state.snapshot()).unwrap();

    // Simulated process restart.
    let reborn = DashboardState::new(SystemClock);
    reborn.restore(snapshots.load().unwrap());
    let stats = reborn.stats();
    assert_eq!(stats.running_tasks, 3);
    assert_eq!(stats.completed_tasks, 2);
    assert_eq!(stats.total_tasks, 5);
}

#[test]
fn corrupted_primary_restores_from_backup() {
    let dir = tempfile::tempdir().unwrap();
    let snapshots = SnapshotStore::new(dir.path().join("dashboard-state.json"));
    let state = populated_state();
    // Two saves so the backup generation exists, then a torn primary.
    snapshots.save(&state.snapshot()).unwrap();
    snapshots.save(&state.snapshot()).unwrap();
    std::fs::write(snapshots.path(), b"{torn").unwrap();

    let reborn = DashboardState::new(SystemClock);
    reborn.restore(snapshots.load().unwrap());
    assert_eq!(reborn.stats().total_tasks, 5);
}

#[tokio::test]
async fn restored_running_tasks_are_reaped_by_the_orphan_sweep() {
    use gofer_adapters::FakeChatAdapter;
    use gofer_tracker::{ProgressTracker, TrackerConfig};

    let dir = tempfile::tempdir().unwrap();
    let snapshots = SnapshotStore::new(dir.path().join("dashboard-state.json"));
    snapshots.save(&populated_state().snapshot()).unwrap();

    let dashboard = Arc::new(DashboardState::new(SystemClock));
    dashboard.restore(snapshots.load().unwrap());
    let tracker = ProgressTracker::new(
        TrackerConfig::default(),
        Arc::clone(&dashboard),
        Arc::new(FakeChatAdapter::new()),
        SystemClock,
    );

    // Restored tasks have no heartbeat timer: all three running ones heal
    // to error; the completed ones are untouched.
    assert_eq!(tracker.cleanup_zombie_tasks(), 3);
    let stats = dashboard.stats();
    assert_eq!(stats.running_tasks, 0);
    assert_eq!(stats.completed_tasks, 2);
    let healed = dashboard.get_task("run-0").unwrap();
    assert_eq!(healed.status, LiveStatus::Error);
    assert_eq!(healed.output.as_deref(), Some("process terminated without heartbeat"));
}
