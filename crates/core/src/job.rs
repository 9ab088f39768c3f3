// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent job model and its state machine.
//!
//! A [`Job`] is a stored unit of scheduled work: either `periodic`
//! (re-armed after every execution) or `scheduled` (one-shot at a fixed
//! epoch time). The scheduler claims due jobs, the runner executes them,
//! and the resulting [`ExecutionRecord`]s accumulate in a bounded history.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Default cap on retained execution records per job.
pub const DEFAULT_MAX_HISTORY: usize = 100;

crate::define_id! {
    /// Unique identifier for a stored job.
    pub struct JobId("job-");
}

/// Kind of stored job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    /// Runs every `interval` minutes until paused or exhausted.
    Periodic,
    /// Runs once at a fixed epoch time, then completes.
    Scheduled,
}

crate::simple_display! {
    JobType {
        Periodic => "periodic",
        Scheduled => "scheduled",
    }
}

/// Lifecycle status of a stored job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Configuration for periodic jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicConfig {
    /// Interval between executions, in minutes.
    #[serde(rename = "interval")]
    pub interval_minutes: u64,
    /// Run once immediately after creation instead of waiting a full interval.
    #[serde(default)]
    pub run_immediately: bool,
    /// Stop (complete + disable) after this many executions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_runs: Option<u32>,
    /// Keep the schedule armed after a failed execution.
    #[serde(default = "default_continue_on_error")]
    pub continue_on_error: bool,
}

fn default_continue_on_error() -> bool {
    true
}

impl PeriodicConfig {
    pub fn interval_ms(&self) -> u64 {
        self.interval_minutes.saturating_mul(60_000)
    }
}

/// Configuration for one-shot scheduled jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledConfig {
    /// Epoch milliseconds at which the job becomes due.
    #[serde(rename = "scheduledTime")]
    pub scheduled_time_ms: u64,
}

/// Record of one job execution, kept in the job's bounded history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub start_time: u64,
    pub end_time: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file_path: Option<PathBuf>,
    /// Wall-clock duration in milliseconds.
    pub duration: u64,
}

/// Persistent scheduled/periodic task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    /// Verbatim argument string handed to the model CLI.
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodic_config: Option<PeriodicConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_config: Option<ScheduledConfig>,
    pub status: JobStatus,
    pub enabled: bool,
    /// Deliver a chat notification after each execution.
    #[serde(rename = "notifyQQ", default)]
    pub notify_enabled: bool,
    /// Channel-user identifier for notifications. The reserved sentinel
    /// `"dashboard"` (or an empty string) suppresses delivery.
    #[serde(default)]
    pub notify_target: String,
    #[serde(default)]
    pub save_result: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_dir: Option<PathBuf>,
    pub created_at: u64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "lastExecutionTime"
    )]
    pub last_execution_ms: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "nextExecutionTime"
    )]
    pub next_execution_ms: Option<u64>,
    #[serde(default)]
    pub execution_count: u32,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(default)]
    pub execution_history: Vec<ExecutionRecord>,
}

/// Sentinel notify target meaning "surface on the dashboard only".
pub const DASHBOARD_TARGET: &str = "dashboard";

impl Job {
    /// Whether this job should be picked up by a heartbeat at `now_ms`.
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.enabled
            && self.status == JobStatus::Pending
            && self.next_execution_ms.is_some_and(|next| next <= now_ms)
    }

    /// Whether a completed execution should produce a chat notification.
    pub fn wants_notification(&self) -> bool {
        self.notify_enabled
            && !self.notify_target.is_empty()
            && self.notify_target != DASHBOARD_TARGET
    }

    /// Fold one execution into the job: append to the bounded history,
    /// bump counters, and re-arm or terminate the schedule.
    ///
    /// Invariants maintained here:
    /// - `execution_history.len() <= max_history`, most recent kept
    /// - periodic: `next_execution_ms = last_execution_ms + interval`
    /// - scheduled: one successful run is terminal (`completed`, disabled)
    /// - periodic with `continue_on_error = false`: failure is terminal
    /// - periodic with `max_runs`: exhaustion is terminal
    pub fn record_execution(&mut self, record: ExecutionRecord, max_history: usize) {
        let success = record.success;
        self.last_execution_ms = Some(record.start_time);
        self.execution_count += 1;
        if !success {
            self.failure_count += 1;
        }
        self.execution_history.push(record);
        if self.execution_history.len() > max_history {
            let excess = self.execution_history.len() - max_history;
            self.execution_history.drain(..excess);
        }

        match self.job_type {
            JobType::Scheduled => {
                if success {
                    self.status = JobStatus::Completed;
                    self.enabled = false;
                } else {
                    self.status = JobStatus::Failed;
                    self.enabled = false;
                }
            }
            JobType::Periodic => {
                let Some(config) = self.periodic_config.clone() else {
                    return;
                };
                if !success && !config.continue_on_error {
                    self.status = JobStatus::Failed;
                    self.enabled = false;
                    return;
                }
                if config.max_runs.is_some_and(|max| self.execution_count >= max) {
                    self.status = JobStatus::Completed;
                    self.enabled = false;
                    return;
                }
                self.status = JobStatus::Pending;
                self.next_execution_ms =
                    Some(self.last_execution_ms.unwrap_or_default() + config.interval_ms());
            }
        }
    }
}

/// Parameters for creating a job through the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub command: String,
    #[serde(default)]
    pub periodic_config: Option<PeriodicConfig>,
    #[serde(default)]
    pub scheduled_config: Option<ScheduledConfig>,
    #[serde(rename = "notifyQQ", default)]
    pub notify_enabled: bool,
    #[serde(default)]
    pub notify_target: String,
    #[serde(default)]
    pub save_result: bool,
    #[serde(default)]
    pub result_dir: Option<PathBuf>,
}

impl NewJob {
    /// Check type/config coherence.
    pub fn validate(&self) -> Result<(), JobConfigError> {
        if self.name.trim().is_empty() {
            return Err(JobConfigError::EmptyName);
        }
        if self.command.trim().is_empty() {
            return Err(JobConfigError::EmptyCommand);
        }
        match self.job_type {
            JobType::Periodic => {
                let config = self
                    .periodic_config
                    .as_ref()
                    .ok_or(JobConfigError::MissingPeriodicConfig)?;
                if config.interval_minutes == 0 {
                    return Err(JobConfigError::ZeroInterval);
                }
            }
            JobType::Scheduled => {
                if self.scheduled_config.is_none() {
                    return Err(JobConfigError::MissingScheduledConfig);
                }
            }
        }
        Ok(())
    }

    /// First `next_execution_ms` for a job created at `now_ms`.
    pub fn initial_next_execution(&self, now_ms: u64) -> Option<u64> {
        match self.job_type {
            JobType::Periodic => self.periodic_config.as_ref().map(|config| {
                if config.run_immediately {
                    now_ms
                } else {
                    now_ms + config.interval_ms()
                }
            }),
            JobType::Scheduled => self.scheduled_config.map(|config| config.scheduled_time_ms),
        }
    }

    /// Materialize the job record.
    pub fn into_job(self, id: JobId, now_ms: u64) -> Job {
        let next_execution_ms = self.initial_next_execution(now_ms);
        Job {
            id,
            name: self.name,
            description: self.description,
            job_type: self.job_type,
            command: self.command,
            periodic_config: self.periodic_config,
            scheduled_config: self.scheduled_config,
            status: JobStatus::Pending,
            enabled: true,
            notify_enabled: self.notify_enabled,
            notify_target: self.notify_target,
            save_result: self.save_result,
            result_dir: self.result_dir,
            created_at: now_ms,
            last_execution_ms: None,
            next_execution_ms,
            execution_count: 0,
            failure_count: 0,
            execution_history: Vec::new(),
        }
    }
}

/// Shallow-merge patch for `TaskStore::update`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub periodic_config: Option<PeriodicConfig>,
    #[serde(default)]
    pub scheduled_config: Option<ScheduledConfig>,
    #[serde(rename = "notifyQQ", default)]
    pub notify_enabled: Option<bool>,
    #[serde(default)]
    pub notify_target: Option<String>,
    #[serde(default)]
    pub save_result: Option<bool>,
    #[serde(default)]
    pub result_dir: Option<PathBuf>,
    #[serde(default, rename = "nextExecutionTime")]
    pub next_execution_ms: Option<u64>,
}

impl JobUpdate {
    /// Apply the set fields onto `job`, leaving the rest untouched.
    pub fn apply(self, job: &mut Job) {
        if let Some(name) = self.name {
            job.name = name;
        }
        if let Some(description) = self.description {
            job.description = description;
        }
        if let Some(command) = self.command {
            job.command = command;
        }
        if let Some(enabled) = self.enabled {
            job.enabled = enabled;
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(config) = self.periodic_config {
            job.periodic_config = Some(config);
        }
        if let Some(config) = self.scheduled_config {
            job.scheduled_config = Some(config);
        }
        if let Some(notify) = self.notify_enabled {
            job.notify_enabled = notify;
        }
        if let Some(target) = self.notify_target {
            job.notify_target = target;
        }
        if let Some(save) = self.save_result {
            job.save_result = save;
        }
        if let Some(dir) = self.result_dir {
            job.result_dir = Some(dir);
        }
        if let Some(next) = self.next_execution_ms {
            job.next_execution_ms = Some(next);
        }
    }
}

/// Aggregate job counts for the control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatistics {
    pub total: usize,
    pub periodic: usize,
    pub scheduled: usize,
    pub pending: usize,
    pub running: usize,
    pub paused: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Invalid job creation parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobConfigError {
    #[error("job name must not be empty")]
    EmptyName,
    #[error("job command must not be empty")]
    EmptyCommand,
    #[error("periodic job requires periodicConfig")]
    MissingPeriodicConfig,
    #[error("scheduled job requires scheduledConfig")]
    MissingScheduledConfig,
    #[error("periodic interval must be at least one minute")]
    ZeroInterval,
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            name: String = "test-job",
            description: String = "",
            command: String = "echo test",
            notify_target: String = "",
        }
        set {
            job_type: JobType = JobType::Periodic,
            status: JobStatus = JobStatus::Pending,
            enabled: bool = true,
            notify_enabled: bool = false,
            save_result: bool = false,
            created_at: u64 = 1_000_000,
            execution_count: u32 = 0,
            failure_count: u32 = 0,
        }
        option {
            periodic_config: PeriodicConfig = Some(PeriodicConfig {
                interval_minutes: 1,
                run_immediately: false,
                max_runs: None,
                continue_on_error: true,
            }),
            scheduled_config: ScheduledConfig = None,
            result_dir: PathBuf = None,
            last_execution_ms: u64 = None,
            next_execution_ms: u64 = None,
        }
        computed {
            id: JobId = JobId::new(),
            execution_history: Vec<ExecutionRecord> = Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
