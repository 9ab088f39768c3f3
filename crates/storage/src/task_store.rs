// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent job store behind the scheduler.
//!
//! One JSON document holds every job, rewritten atomically after each
//! mutation. All mutators funnel through the interior mutex, which is the
//! single-writer discipline: there is exactly one writer to the file at
//! any time, and readers of the file (only ever this process after a
//! restart) see either the old or the new document, never a torn one.
//!
//! Jobs keep their creation order — the scheduler's due selection is
//! defined in enumeration order, so the store must not reshuffle.

use crate::persist::{read_json, write_atomic, PersistError};
use gofer_core::{
    Clock, ExecutionRecord, Job, JobConfigError, JobId, JobStatistics, JobStatus, JobType,
    JobUpdate, NewJob, SystemClock,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Document version written to disk.
const STORE_VERSION: u32 = 1;

/// Store construction parameters.
#[derive(Debug, Clone)]
pub struct TaskStoreConfig {
    /// Path of the JSON document.
    pub path: PathBuf,
    /// Cap on retained execution records per job.
    pub max_history: usize,
}

impl TaskStoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), max_history: gofer_core::job::DEFAULT_MAX_HISTORY }
    }
}

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    InvalidConfig(#[from] JobConfigError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// On-disk shape of the store document.
#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    #[serde(rename = "savedAt")]
    saved_at: u64,
    jobs: Vec<Job>,
}

/// Persistent typed store of jobs plus execution history.
pub struct TaskStore<C: Clock = SystemClock> {
    config: TaskStoreConfig,
    clock: C,
    jobs: Mutex<Vec<Job>>,
}

impl TaskStore<SystemClock> {
    /// Open the store with the system clock.
    pub fn open(config: TaskStoreConfig) -> Self {
        Self::open_with_clock(config, SystemClock)
    }
}

impl<C: Clock> TaskStore<C> {
    /// Open the store, loading the persisted document when present.
    ///
    /// A missing file starts empty; a corrupt file is logged loudly and
    /// also starts empty rather than refusing to boot the gateway.
    pub fn open_with_clock(config: TaskStoreConfig, clock: C) -> Self {
        let jobs = if config.path.exists() {
            match read_json::<StoreDocument>(&config.path) {
                Ok(document) => {
                    tracing::info!(
                        path = %config.path.display(),
                        jobs = document.jobs.len(),
                        "task store loaded"
                    );
                    document.jobs
                }
                Err(error) => {
                    tracing::error!(
                        path = %config.path.display(),
                        %error,
                        "task store document unreadable, starting empty"
                    );
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        Self { config, clock, jobs: Mutex::new(jobs) }
    }

    /// Create a job from validated parameters and persist it.
    pub fn create(&self, params: NewJob) -> Result<Job, StoreError> {
        params.validate()?;
        let job = params.into_job(JobId::new(), self.clock.epoch_ms());
        let mut jobs = self.jobs.lock();
        jobs.push(job.clone());
        self.persist(&jobs)?;
        tracing::info!(job_id = %job.id, name = %job.name, job_type = %job.job_type, "job created");
        Ok(job)
    }

    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.lock().iter().find(|job| &job.id == id).cloned()
    }

    pub fn get_all(&self) -> Vec<Job> {
        self.jobs.lock().clone()
    }

    pub fn get_by_status(&self, status: JobStatus) -> Vec<Job> {
        self.jobs.lock().iter().filter(|job| job.status == status).cloned().collect()
    }

    pub fn get_enabled_tasks(&self) -> Vec<Job> {
        self.jobs.lock().iter().filter(|job| job.enabled).cloned().collect()
    }

    /// Shallow-merge `update` into the job and persist.
    pub fn update(&self, id: &JobId, update: JobUpdate) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.lock();
        let job = find_mut(&mut jobs, id)?;
        update.apply(job);
        let updated = job.clone();
        self.persist(&jobs)?;
        Ok(updated)
    }

    /// Status-only update variant.
    pub fn update_task_status(&self, id: &JobId, status: JobStatus) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock();
        let job = find_mut(&mut jobs, id)?;
        job.status = status;
        self.persist(&jobs)?;
        Ok(())
    }

    /// Hard-delete a job.
    pub fn delete(&self, id: &JobId) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock();
        let before = jobs.len();
        jobs.retain(|job| &job.id != id);
        if jobs.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.persist(&jobs)?;
        tracing::info!(job_id = %id, "job deleted");
        Ok(())
    }

    /// Fold an execution record into the job (bounded history, counters,
    /// schedule re-arm) and persist.
    pub fn add_execution_history(
        &self,
        id: &JobId,
        record: ExecutionRecord,
    ) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.lock();
        let job = find_mut(&mut jobs, id)?;
        job.record_execution(record, self.config.max_history);
        let updated = job.clone();
        self.persist(&jobs)?;
        Ok(updated)
    }

    /// Revert a zombie back to `pending`; periodic jobs are re-armed a
    /// full interval out from now.
    pub fn revert_to_pending(&self, id: &JobId) -> Result<(), StoreError> {
        let now_ms = self.clock.epoch_ms();
        let mut jobs = self.jobs.lock();
        let job = find_mut(&mut jobs, id)?;
        job.status = JobStatus::Pending;
        if let Some(config) = &job.periodic_config {
            job.next_execution_ms = Some(now_ms + config.interval_ms());
        }
        self.persist(&jobs)?;
        Ok(())
    }

    /// Aggregate counts for the control plane.
    pub fn get_statistics(&self) -> JobStatistics {
        let jobs = self.jobs.lock();
        let mut stats = JobStatistics { total: jobs.len(), ..JobStatistics::default() };
        for job in jobs.iter() {
            match job.job_type {
                JobType::Periodic => stats.periodic += 1,
                JobType::Scheduled => stats.scheduled += 1,
            }
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Paused => stats.paused += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    fn persist(&self, jobs: &[Job]) -> Result<(), PersistError> {
        let document = StoreDocument {
            version: STORE_VERSION,
            saved_at: self.clock.epoch_ms(),
            jobs: jobs.to_vec(),
        };
        write_atomic(&self.config.path, &document)
    }
}

fn find_mut<'a>(jobs: &'a mut [Job], id: &JobId) -> Result<&'a mut Job, StoreError> {
    jobs.iter_mut()
        .find(|job| &job.id == id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

#[cfg(test)]
#[path = "task_store_tests.rs"]
mod tests;
