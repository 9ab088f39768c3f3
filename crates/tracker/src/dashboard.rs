// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide dashboard state with crash-safe snapshots.
//!
//! [`DashboardState`] is the in-memory live-task map plus derived stats;
//! every mutation recomputes the counters and marks the state dirty.
//! [`DashboardStore`] is the sole persister: a background cadence that
//! snapshots iff dirty, plus a forced final save on shutdown.

use gofer_core::{Clock, DashboardStats, LiveStatus, LiveTask, SystemClock};
use gofer_storage::{DashboardSnapshot, SnapshotStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

struct DashboardInner {
    tasks: HashMap<String, LiveTask>,
    stats: DashboardStats,
    dirty: bool,
}

/// In-memory task/stats registry.
pub struct DashboardState<C: Clock = SystemClock> {
    clock: C,
    inner: Mutex<DashboardInner>,
}

impl<C: Clock> DashboardState<C> {
    pub fn new(clock: C) -> Self {
        let start_time = clock.epoch_ms();
        Self {
            clock,
            inner: Mutex::new(DashboardInner {
                tasks: HashMap::new(),
                stats: DashboardStats { start_time, ..DashboardStats::default() },
                dirty: false,
            }),
        }
    }

    /// Insert or replace a live task, then recompute stats.
    pub fn upsert_task(&self, task: LiveTask) {
        let mut inner = self.inner.lock();
        inner.tasks.insert(task.id.clone(), task);
        recompute(&mut inner);
    }

    /// Mutate one task in place, then recompute stats. Returns false when
    /// the id is unknown.
    pub fn with_task(&self, id: &str, mutate: impl FnOnce(&mut LiveTask)) -> bool {
        let mut inner = self.inner.lock();
        let Some(task) = inner.tasks.get_mut(id) else {
            return false;
        };
        mutate(task);
        recompute(&mut inner);
        true
    }

    pub fn get_task(&self, id: &str) -> Option<LiveTask> {
        self.inner.lock().tasks.get(id).cloned()
    }

    /// All tasks, newest first.
    pub fn tasks(&self) -> Vec<LiveTask> {
        let inner = self.inner.lock();
        let mut tasks: Vec<LiveTask> = inner.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(a.id.cmp(&b.id)));
        tasks
    }

    /// Running tasks, newest first.
    pub fn running_tasks(&self) -> Vec<LiveTask> {
        self.tasks().into_iter().filter(LiveTask::is_running).collect()
    }

    /// Drop finished (completed/error) tasks. Returns how many were removed.
    pub fn clear_finished(&self) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.tasks.len();
        inner.tasks.retain(|_, task| task.is_running());
        let removed = before - inner.tasks.len();
        if removed > 0 {
            recompute(&mut inner);
        }
        removed
    }

    /// Current stats with live uptime.
    pub fn stats(&self) -> DashboardStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats;
        stats.uptime = self.clock.epoch_ms().saturating_sub(stats.start_time);
        stats
    }

    pub fn mark_dirty(&self) {
        self.inner.lock().dirty = true;
    }

    /// Atomically read-and-clear the dirty flag.
    pub fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.inner.lock().dirty)
    }

    /// Deterministic snapshot of the current state.
    pub fn snapshot(&self) -> DashboardSnapshot {
        let inner = self.inner.lock();
        let mut tasks: Vec<(String, LiveTask)> =
            inner.tasks.iter().map(|(id, task)| (id.clone(), task.clone())).collect();
        tasks.sort_by(|a, b| a.0.cmp(&b.0));
        DashboardSnapshot::new(self.clock.epoch_ms(), tasks, inner.stats)
    }

    /// Replace the state from a loaded snapshot.
    pub fn restore(&self, snapshot: DashboardSnapshot) {
        let mut inner = self.inner.lock();
        let start_time = inner.stats.start_time;
        inner.tasks = snapshot.tasks.into_iter().collect();
        recompute(&mut inner);
        // Uptime restarts with the process; the restored counters do not.
        inner.stats.start_time = start_time;
        inner.dirty = false;
    }
}

/// Recompute the derived counters from the map. Invariant: called after
/// every mutation, so the stats never drift from the map.
fn recompute(inner: &mut DashboardInner) {
    inner.stats.total_tasks = inner.tasks.len();
    inner.stats.running_tasks =
        inner.tasks.values().filter(|task| task.status == LiveStatus::Running).count();
    inner.stats.completed_tasks =
        inner.tasks.values().filter(|task| task.status == LiveStatus::Completed).count();
    inner.dirty = true;
}

/// Background snapshotter over a [`DashboardState`].
pub struct DashboardStore<C: Clock = SystemClock> {
    state: Arc<DashboardState<C>>,
    snapshots: SnapshotStore,
    interval: Duration,
    cadence: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Clock> DashboardStore<C> {
    /// Default snapshot cadence.
    pub const DEFAULT_INTERVAL_MS: u64 = 60_000;

    pub fn new(state: Arc<DashboardState<C>>, snapshots: SnapshotStore, interval_ms: u64) -> Self {
        Self {
            state,
            snapshots,
            interval: Duration::from_millis(interval_ms),
            cadence: Mutex::new(None),
        }
    }

    /// Restore persisted state (primary, then backup), then begin the
    /// periodic dirty-checked snapshot cadence.
    pub fn start(&self) {
        if let Some(snapshot) = self.snapshots.load() {
            tracing::info!(tasks = snapshot.tasks.len(), "dashboard state restored");
            self.state.restore(snapshot);
        }
        let state = Arc::clone(&self.state);
        let snapshots = self.snapshots.clone();
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if state.take_dirty() {
                    if let Err(error) = snapshots.save(&state.snapshot()) {
                        tracing::warn!(%error, "dashboard snapshot failed");
                        state.mark_dirty();
                    }
                }
            }
        });
        *self.cadence.lock() = Some(handle);
    }

    /// Force one save now iff dirty.
    pub fn save_if_dirty(&self) -> bool {
        if !self.state.take_dirty() {
            return false;
        }
        match self.snapshots.save(&self.state.snapshot()) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "dashboard snapshot failed");
                self.state.mark_dirty();
                false
            }
        }
    }

    /// Stop the cadence and flush a final snapshot.
    pub fn shutdown(&self) {
        if let Some(handle) = self.cadence.lock().take() {
            handle.abort();
        }
        self.save_if_dirty();
    }
}

#[cfg(test)]
#[path = "dashboard_tests.rs"]
mod tests;
