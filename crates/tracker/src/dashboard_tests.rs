// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gofer_core::FakeClock;

fn state() -> (DashboardState<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    (DashboardState::new(clock.clone()), clock)
}

fn running(id: &str) -> LiveTask {
    LiveTask::builder().id(id).build()
}

fn finished(id: &str, at: u64) -> LiveTask {
    let mut task = LiveTask::builder().id(id).build();
    task.finish(LiveStatus::Completed, Some("done".to_string()), at);
    task
}

#[test]
fn stats_always_match_the_map() {
    let (state, _clock) = state();
    state.upsert_task(running("a"));
    state.upsert_task(running("b"));
    state.upsert_task(finished("c", 1_500_000));

    let stats = state.stats();
    assert_eq!(stats.total_tasks, 3);
    assert_eq!(stats.running_tasks, 2);
    assert_eq!(stats.completed_tasks, 1);

    state.with_task("a", |task| {
        task.finish(LiveStatus::Error, Some("boom".to_string()), 1_600_000)
    });
    let stats = state.stats();
    assert_eq!(stats.running_tasks, 1);
    assert_eq!(stats.completed_tasks, 1);
}

#[test]
fn uptime_tracks_the_clock() {
    let (state, clock) = state();
    clock.advance_ms(42_000);
    assert_eq!(state.stats().uptime, 42_000);
    assert_eq!(state.stats().start_time, 1_000_000);
}

#[test]
fn mutations_mark_dirty_and_take_clears() {
    let (state, _clock) = state();
    assert!(!state.take_dirty());
    state.upsert_task(running("a"));
    assert!(state.take_dirty());
    assert!(!state.take_dirty());
}

#[test]
fn clear_finished_keeps_running_tasks() {
    let (state, _clock) = state();
    state.upsert_task(running("a"));
    state.upsert_task(finished("b", 1_100_000));
    state.upsert_task(finished("c", 1_200_000));

    assert_eq!(state.clear_finished(), 2);
    assert_eq!(state.tasks().len(), 1);
    assert_eq!(state.stats().total_tasks, 1);
}

#[test]
fn tasks_are_listed_newest_first() {
    let (state, _clock) = state();
    let mut old = running("old");
    old.start_time = 1_000;
    let mut new = running("new");
    new.start_time = 2_000;
    state.upsert_task(old);
    state.upsert_task(new);
    let ids: Vec<String> = state.tasks().into_iter().map(|task| task.id).collect();
    assert_eq!(ids, vec!["new", "old"]);
}

#[test]
fn snapshot_round_trips_through_restore() {
    let (state, clock) = state();
    state.upsert_task(running("a"));
    state.upsert_task(finished("b", 1_100_000));
    let snapshot = state.snapshot();

    let restored = DashboardState::new(clock);
    restored.restore(snapshot);
    assert_eq!(restored.tasks(), state.tasks());
    let stats = restored.stats();
    assert_eq!(stats.total_tasks, 2);
    assert_eq!(stats.running_tasks, 1);
    assert_eq!(stats.completed_tasks, 1);
}

#[tokio::test]
async fn store_persists_and_restores_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let snapshots = SnapshotStore::new(dir.path().join("dashboard-state.json"));
    let clock = FakeClock::new();

    let state = Arc::new(DashboardState::new(clock.clone()));
    state.upsert_task(running("a"));
    state.upsert_task(finished("b", 500));
    let store = DashboardStore::new(Arc::clone(&state), snapshots.clone(), 60_000);
    assert!(store.save_if_dirty());

    // A fresh process: restore through start().
    let reborn = Arc::new(DashboardState::new(clock));
    let store = DashboardStore::new(Arc::clone(&reborn), snapshots, 60_000);
    store.start();
    assert_eq!(reborn.tasks().len(), 2);
    assert_eq!(reborn.stats().running_tasks, 1);
    store.shutdown();
}

#[tokio::test]
async fn shutdown_flushes_a_final_save() {
    let dir = tempfile::tempdir().unwrap();
    let snapshots = SnapshotStore::new(dir.path().join("dashboard-state.json"));
    let state = Arc::new(DashboardState::new(FakeClock::new()));
    let store = DashboardStore::new(Arc::clone(&state), snapshots.clone(), 3_600_000);
    store.start();

    state.upsert_task(running("a"));
    store.shutdown();
    assert_eq!(snapshots.load().unwrap().tasks.len(), 1);
}

#[test]
fn save_if_dirty_skips_clean_state() {
    let dir = tempfile::tempdir().unwrap();
    let snapshots = SnapshotStore::new(dir.path().join("dashboard-state.json"));
    let state = Arc::new(DashboardState::new(FakeClock::new()));
    let store = DashboardStore::new(Arc::clone(&state), snapshots.clone(), 60_000);
    assert!(!store.save_if_dirty());
    assert!(snapshots.load().is_none());
}
