// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler specs: heartbeat dispatch, zombie revival, history bounds.

use crate::helpers::{stub_cli, wait_until};
use gofer_adapters::FakeChatAdapter;
use gofer_core::test_support::{new_periodic_job, ok_record};
use gofer_core::{JobStatus, SystemClock};
use gofer_engine::{RunnerConfig, Scheduler, SchedulerConfig, TaskRunner};
use gofer_storage::{TaskStore, TaskStoreConfig};
use std::sync::Arc;
use tempfile::TempDir;

fn scheduler_over(
    dir: &TempDir,
    stub_body: &str,
    heartbeat_ms: u64,
) -> (Scheduler, Arc<TaskStore>) {
    let cli = stub_cli(dir, stub_body);
    let store = Arc::new(TaskStore::open(TaskStoreConfig::new(dir.path().join("tasks.json"))));
    let runner = Arc::new(TaskRunner::new(RunnerConfig {
        cli_path: cli.display().to_string(),
        result_dir: dir.path().join("results"),
        ..RunnerConfig::default()
    }));
    let scheduler = Scheduler::new(
        SchedulerConfig { heartbeat_interval_ms: heartbeat_ms, ..SchedulerConfig::default() },
        Arc::clone(&store),
        runner,
        Arc::new(FakeChatAdapter::new()),
        SystemClock,
    );
    (scheduler, store)
}

#[tokio::test]
async fn periodic_run_immediately_executes_within_one_heartbeat() {
    let dir = tempfile::tempdir().unwrap();
    // Fast real heartbeat: the background loop does the dispatching.
    let (scheduler, store) = scheduler_over(&dir, "echo hi", 50);
    let job = store.create(new_periodic_job("minutely", 1, true)).unwrap();
    let first_run_due = job.next_execution_ms.unwrap();
    scheduler.start();

    let probe = Arc::clone(&store);
    let id = job.id.clone();
    wait_until(move || probe.get(&id).is_some_and(|job| job.execution_count == 1)).await;

    let job = store.get(&job.id).unwrap();
    assert!(job.execution_history[0].success);
    let next = job.next_execution_ms.unwrap();
    let rearmed_after = next - job.last_execution_ms.unwrap();
    assert_eq!(rearmed_after, 60_000);
    assert!(job.last_execution_ms.unwrap() >= first_run_due);
    scheduler.stop().await;
}

#[tokio::test]
async fn stored_running_job_is_pending_after_start() {
    let dir = tempfile::tempdir().unwrap();
    let (scheduler, store) = scheduler_over(&dir, "echo hi", 3_600_000);
    let job = store.create(new_periodic_job("z", 1, false)).unwrap();
    store.update_task_status(&job.id, JobStatus::Running).unwrap();

    scheduler.start();
    assert_eq!(store.get(&job.id).unwrap().status, JobStatus::Pending);
    scheduler.stop().await;
}

#[tokio::test]
async fn two_hundred_executions_keep_the_most_recent_hundred() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::open(TaskStoreConfig::new(dir.path().join("tasks.json")));
    let job = store.create(new_periodic_job("busy", 1, false)).unwrap();
    for n in 0..200u64 {
        store.add_execution_history(&job.id, ok_record(n * 60_000)).unwrap();
    }
    let job = store.get(&job.id).unwrap();
    assert_eq!(job.execution_history.len(), 100);
    assert_eq!(job.execution_count, 200);
    assert_eq!(job.execution_history[0].start_time, 100 * 60_000);
    assert_eq!(job.execution_history[99].start_time, 199 * 60_000);
}

#[tokio::test]
async fn store_survives_reopen_with_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let id = {
        let store = TaskStore::open(TaskStoreConfig::new(&path));
        let job = store.create(new_periodic_job("tick", 1, false)).unwrap();
        store.add_execution_history(&job.id, ok_record(1_000)).unwrap();
        job.id
    };
    let store = TaskStore::open(TaskStoreConfig::new(&path));
    let job = store.get(&id).unwrap();
    assert_eq!(job.execution_count, 1);
    assert_eq!(job.execution_history.len(), 1);
}
