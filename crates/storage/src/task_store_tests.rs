// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gofer_core::test_support::{failed_record, new_periodic_job, new_scheduled_job, ok_record};
use gofer_core::FakeClock;
use tempfile::TempDir;

fn store(dir: &TempDir) -> (TaskStore<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let config = TaskStoreConfig::new(dir.path().join("tasks.json"));
    (TaskStore::open_with_clock(config, clock.clone()), clock)
}

#[test]
fn create_assigns_id_and_initial_schedule() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _clock) = store(&dir);

    let job = store.create(new_periodic_job("tick", 5, false)).unwrap();
    assert!(job.id.as_str().starts_with("job-"));
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.next_execution_ms, Some(1_000_000 + 300_000));

    let immediate = store.create(new_periodic_job("now", 5, true)).unwrap();
    assert_eq!(immediate.next_execution_ms, Some(1_000_000));

    let scheduled = store.create(new_scheduled_job("once", 9_999_999)).unwrap();
    assert_eq!(scheduled.next_execution_ms, Some(9_999_999));
}

#[test]
fn create_rejects_incoherent_params() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _clock) = store(&dir);
    let mut params = new_periodic_job("bad", 5, false);
    params.periodic_config = None;
    assert!(matches!(store.create(params), Err(StoreError::InvalidConfig(_))));
    assert!(store.get_all().is_empty());
}

#[test]
fn persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let clock = FakeClock::new();
    let id = {
        let store =
            TaskStore::open_with_clock(TaskStoreConfig::new(&path), clock.clone());
        store.create(new_periodic_job("tick", 1, false)).unwrap().id
    };
    let reopened = TaskStore::open_with_clock(TaskStoreConfig::new(&path), clock);
    let job = reopened.get(&id).unwrap();
    assert_eq!(job.name, "tick");
}

#[test]
fn corrupt_document_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    std::fs::write(&path, b"{definitely not json").unwrap();
    let store = TaskStore::open_with_clock(TaskStoreConfig::new(&path), FakeClock::new());
    assert!(store.get_all().is_empty());
}

#[test]
fn queries_filter_by_status_and_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _clock) = store(&dir);
    let a = store.create(new_periodic_job("a", 1, false)).unwrap();
    let b = store.create(new_periodic_job("b", 1, false)).unwrap();
    store.update_task_status(&a.id, JobStatus::Running).unwrap();
    store
        .update(&b.id, JobUpdate { enabled: Some(false), ..JobUpdate::default() })
        .unwrap();

    assert_eq!(store.get_by_status(JobStatus::Running).len(), 1);
    let enabled = store.get_enabled_tasks();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].id, a.id);
}

#[test]
fn enumeration_keeps_creation_order() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _clock) = store(&dir);
    for name in ["first", "second", "third"] {
        store.create(new_periodic_job(name, 1, false)).unwrap();
    }
    let names: Vec<String> = store.get_all().into_iter().map(|job| job.name).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[test]
fn history_appends_trim_and_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let clock = FakeClock::new();
    let config = TaskStoreConfig { path, max_history: 3 };
    let store = TaskStore::open_with_clock(config, clock);
    let job = store.create(new_periodic_job("tick", 1, false)).unwrap();

    for i in 0..5u64 {
        store.add_execution_history(&job.id, ok_record(i * 1_000)).unwrap();
    }
    store.add_execution_history(&job.id, failed_record(9_000, "boom")).unwrap();

    let job = store.get(&job.id).unwrap();
    assert_eq!(job.execution_history.len(), 3);
    assert_eq!(job.execution_count, 6);
    assert_eq!(job.failure_count, 1);
    // Periodic re-arm from the last start time.
    assert_eq!(job.next_execution_ms, Some(9_000 + 60_000));
}

#[test]
fn delete_is_hard_and_missing_ids_error() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _clock) = store(&dir);
    let job = store.create(new_periodic_job("tick", 1, false)).unwrap();
    store.delete(&job.id).unwrap();
    assert!(store.get(&job.id).is_none());
    assert!(matches!(store.delete(&job.id), Err(StoreError::NotFound(_))));
}

#[test]
fn revert_to_pending_rearms_periodic_from_now() {
    let dir = tempfile::tempdir().unwrap();
    let (store, clock) = store(&dir);
    let job = store.create(new_periodic_job("tick", 1, true)).unwrap();
    store.update_task_status(&job.id, JobStatus::Running).unwrap();

    clock.advance_ms(5_000);
    store.revert_to_pending(&job.id).unwrap();
    let job = store.get(&job.id).unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.next_execution_ms, Some(1_005_000 + 60_000));
}

#[test]
fn statistics_aggregate_type_and_status() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _clock) = store(&dir);
    store.create(new_periodic_job("a", 1, false)).unwrap();
    let b = store.create(new_periodic_job("b", 1, false)).unwrap();
    store.create(new_scheduled_job("c", 9_999_999)).unwrap();
    store.update_task_status(&b.id, JobStatus::Paused).unwrap();

    let stats = store.get_statistics();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.periodic, 2);
    assert_eq!(stats.scheduled, 1);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.paused, 1);
}
