// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat-driven dispatch of stored jobs.
//!
//! The scheduler polls the store on a fixed heartbeat, claims due jobs up
//! to the concurrency cap, and hands each to the runner as a detached
//! task. Two self-healing sweeps keep the store honest: on start, every
//! persisted `running` job is a zombie from a prior crash and reverts to
//! `pending`; on every heartbeat, a `running` job with no registered
//! child does the same.

use crate::runner::TaskRunner;
use chrono::{Local, TimeZone};
use gofer_adapters::{DeliveryTarget, SendMessage};
use gofer_core::{Clock, ExecutionRecord, Job, JobId, JobStatus, JobType, JobUpdate, SystemClock};
use gofer_storage::{StoreError, TaskStore};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Scheduler lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

gofer_core::simple_display! {
    SchedulerState {
        Stopped => "stopped",
        Starting => "starting",
        Running => "running",
        Stopping => "stopping",
    }
}

/// Scheduler construction parameters.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub heartbeat_interval_ms: u64,
    /// Cap on concurrently running jobs.
    pub max_concurrent: usize,
    /// Grace period for running jobs to drain on stop.
    pub stop_grace_ms: u64,
    /// Drain poll interval during stop.
    pub stop_poll_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 5_000,
            max_concurrent: 2,
            stop_grace_ms: 30_000,
            stop_poll_ms: 100,
        }
    }
}

/// Errors from scheduler control operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("job already running: {0}")]
    AlreadyRunning(String),
    #[error("concurrency cap reached ({max} running)")]
    ConcurrencyCap { max: usize },
    #[error("operation only valid for periodic jobs: {0}")]
    NotPeriodic(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Heartbeat scheduler over the task store.
pub struct Scheduler<C: Clock = SystemClock> {
    config: SchedulerConfig,
    store: Arc<TaskStore<C>>,
    runner: Arc<TaskRunner<C>>,
    egress: Arc<dyn SendMessage>,
    clock: C,
    state: Arc<Mutex<SchedulerState>>,
    running: Arc<Mutex<HashSet<JobId>>>,
    heartbeat: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<C: Clock> Clone for Scheduler<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            runner: Arc::clone(&self.runner),
            egress: Arc::clone(&self.egress),
            clock: self.clock.clone(),
            state: Arc::clone(&self.state),
            running: Arc::clone(&self.running),
            heartbeat: Arc::clone(&self.heartbeat),
        }
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn new(
        config: SchedulerConfig,
        store: Arc<TaskStore<C>>,
        runner: Arc<TaskRunner<C>>,
        egress: Arc<dyn SendMessage>,
        clock: C,
    ) -> Self {
        Self {
            config,
            store,
            runner,
            egress,
            clock,
            state: Arc::new(Mutex::new(SchedulerState::Stopped)),
            running: Arc::new(Mutex::new(HashSet::new())),
            heartbeat: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    pub fn running_count(&self) -> usize {
        self.running.lock().len()
    }

    pub fn is_job_running(&self, id: &JobId) -> bool {
        self.running.lock().contains(id)
    }

    /// Transition `Stopped → Starting → Running`: revive persisted
    /// zombies, then begin the heartbeat loop.
    pub fn start(&self) {
        {
            let mut state = self.state.lock();
            if *state != SchedulerState::Stopped {
                tracing::warn!(state = %*state, "scheduler start ignored");
                return;
            }
            *state = SchedulerState::Starting;
        }

        for job in self.store.get_by_status(JobStatus::Running) {
            tracing::warn!(job_id = %job.id, name = %job.name, "reviving zombie job from prior run");
            if let Err(error) = self.store.revert_to_pending(&job.id) {
                tracing::error!(job_id = %job.id, %error, "zombie revival failed");
            }
        }

        *self.state.lock() = SchedulerState::Running;
        tracing::info!(
            heartbeat_ms = self.config.heartbeat_interval_ms,
            max_concurrent = self.config.max_concurrent,
            "scheduler running"
        );

        let this = self.clone();
        let interval = Duration::from_millis(self.config.heartbeat_interval_ms);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if this.state() != SchedulerState::Running {
                    break;
                }
                this.tick().await;
            }
        });
        *self.heartbeat.lock() = Some(handle);
    }

    /// One heartbeat: zombie sweep, then due dispatch up to the cap.
    ///
    /// Public so tests can drive heartbeats deterministically.
    pub async fn tick(&self) {
        if self.state() != SchedulerState::Running {
            return;
        }

        // Zombie sweep: persisted running without a registered child.
        for job in self.store.get_enabled_tasks() {
            if job.status == JobStatus::Running && !self.is_job_running(&job.id) {
                tracing::warn!(job_id = %job.id, name = %job.name, "reviving zombie job");
                if let Err(error) = self.store.revert_to_pending(&job.id) {
                    tracing::error!(job_id = %job.id, %error, "zombie revival failed");
                }
            }
        }

        let now_ms = self.clock.epoch_ms();
        let due: Vec<Job> = self
            .store
            .get_enabled_tasks()
            .into_iter()
            .filter(|job| job.is_due(now_ms))
            .collect();

        for job in due {
            {
                let mut running = self.running.lock();
                if running.len() >= self.config.max_concurrent {
                    // Cap reached: later jobs wait for the next heartbeat.
                    break;
                }
                if running.contains(&job.id) {
                    continue;
                }
                running.insert(job.id.clone());
            }
            self.dispatch(job);
        }
    }

    /// Run a job immediately, outside its schedule.
    pub fn execute_task_now(&self, id: &JobId) -> Result<(), SchedulerError> {
        let job = self
            .store
            .get(id)
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))?;
        {
            let mut running = self.running.lock();
            if running.contains(id) {
                return Err(SchedulerError::AlreadyRunning(id.to_string()));
            }
            if running.len() >= self.config.max_concurrent {
                return Err(SchedulerError::ConcurrencyCap { max: self.config.max_concurrent });
            }
            running.insert(id.clone());
        }
        self.dispatch(job);
        Ok(())
    }

    /// Pause a periodic job's schedule.
    pub fn pause_task(&self, id: &JobId) -> Result<(), SchedulerError> {
        let job = self.require_periodic(id)?;
        self.store.update(
            &job.id,
            JobUpdate {
                status: Some(JobStatus::Paused),
                enabled: Some(false),
                ..JobUpdate::default()
            },
        )?;
        tracing::info!(job_id = %id, "job paused");
        Ok(())
    }

    /// Re-arm a paused periodic job a full interval out from now.
    pub fn resume_task(&self, id: &JobId) -> Result<(), SchedulerError> {
        let job = self.require_periodic(id)?;
        let next = job
            .periodic_config
            .as_ref()
            .map(|config| self.clock.epoch_ms() + config.interval_ms());
        self.store.update(
            &job.id,
            JobUpdate {
                status: Some(JobStatus::Pending),
                enabled: Some(true),
                next_execution_ms: next,
                ..JobUpdate::default()
            },
        )?;
        tracing::info!(job_id = %id, "job resumed");
        Ok(())
    }

    /// Cancel any in-flight child, then hard-delete the job.
    pub fn delete_task(&self, id: &JobId) -> Result<(), SchedulerError> {
        if self.runner.cancel(id) {
            tracing::info!(job_id = %id, "canceled in-flight child before delete");
        }
        self.running.lock().remove(id);
        self.store.delete(id)?;
        Ok(())
    }

    /// Transition `Running → Stopping → Stopped`, draining running jobs
    /// for the grace period and force-terminating stragglers.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock();
            if *state != SchedulerState::Running {
                tracing::warn!(state = %*state, "scheduler stop ignored");
                return;
            }
            *state = SchedulerState::Stopping;
        }
        if let Some(handle) = self.heartbeat.lock().take() {
            handle.abort();
        }

        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(self.config.stop_grace_ms);
        while !self.running.lock().is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(self.config.stop_poll_ms)).await;
        }

        let stragglers = self.running_count();
        if stragglers > 0 {
            tracing::warn!(count = stragglers, "grace period elapsed, force-terminating jobs");
            self.runner.cancel_all();
            self.running.lock().clear();
        }
        *self.state.lock() = SchedulerState::Stopped;
        tracing::info!("scheduler stopped");
    }

    fn require_periodic(&self, id: &JobId) -> Result<Job, SchedulerError> {
        let job = self
            .store
            .get(id)
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))?;
        if job.job_type != JobType::Periodic {
            return Err(SchedulerError::NotPeriodic(id.to_string()));
        }
        Ok(job)
    }

    /// Spawn `run_task` as a detached logical task. The job id is already
    /// claimed in the running set.
    fn dispatch(&self, job: Job) {
        if let Err(error) = self.store.update_task_status(&job.id, JobStatus::Running) {
            tracing::error!(job_id = %job.id, %error, "failed to mark job running");
            self.running.lock().remove(&job.id);
            return;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.run_task(job).await;
        });
    }

    async fn run_task(&self, job: Job) {
        tracing::info!(job_id = %job.id, name = %job.name, "job execution starting");
        let record = self.runner.execute(&job).await;

        if let Err(error) = self.store.add_execution_history(&job.id, record.clone()) {
            tracing::error!(job_id = %job.id, %error, "failed to record execution");
        }

        if job.wants_notification() {
            let text = format_notification(&job, &record);
            let target = DeliveryTarget::user(job.notify_target.clone());
            if let Err(error) = self.egress.send_message(&target, &text).await {
                tracing::warn!(job_id = %job.id, %error, "execution notification failed");
            }
        }

        self.running.lock().remove(&job.id);
    }
}

/// Chat notification for a finished execution.
fn format_notification(job: &Job, record: &ExecutionRecord) -> String {
    let start = Local
        .timestamp_millis_opt(record.start_time as i64)
        .single()
        .unwrap_or_else(Local::now);
    let status = if record.success { "✅ 成功" } else { "❌ 失败" };
    let mut text = format!(
        "📋 定时任务执行通知\n\
         ━━━━━━━━━━━━━━━━━━━━━━\n\
         任务名称: {name}\n\
         执行时间: {start}\n\
         执行状态: {status}\n\
         执行耗时: {duration:.2} 秒\n",
        name = job.name,
        start = start.format("%Y-%m-%d %H:%M:%S"),
        status = status,
        duration = record.duration as f64 / 1000.0,
    );
    if let Some(error) = &record.error {
        text.push_str(&format!("错误信息: {error}\n"));
    }
    if let Some(path) = &record.result_file_path {
        text.push_str(&format!("结果文件: {}\n", path.display()));
    }
    text.push_str("━━━━━━━━━━━━━━━━━━━━━━");
    text
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
