// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::job::{ExecutionRecord, NewJob, PeriodicConfig, ScheduledConfig};
use crate::JobType;

/// Proptest strategies for core model types.
pub mod strategies {
    use crate::job::JobStatus;
    use proptest::prelude::*;

    pub fn arb_job_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::Pending),
            Just(JobStatus::Running),
            Just(JobStatus::Paused),
            Just(JobStatus::Completed),
            Just(JobStatus::Failed),
        ]
    }
}

/// A minimal periodic `NewJob` for store-level tests.
pub fn new_periodic_job(name: &str, interval_minutes: u64, run_immediately: bool) -> NewJob {
    NewJob {
        name: name.to_string(),
        description: String::new(),
        job_type: JobType::Periodic,
        command: "echo hi".to_string(),
        periodic_config: Some(PeriodicConfig {
            interval_minutes,
            run_immediately,
            max_runs: None,
            continue_on_error: true,
        }),
        scheduled_config: None,
        notify_enabled: false,
        notify_target: String::new(),
        save_result: false,
        result_dir: None,
    }
}

/// A minimal one-shot `NewJob` for store-level tests.
pub fn new_scheduled_job(name: &str, scheduled_time_ms: u64) -> NewJob {
    NewJob {
        name: name.to_string(),
        description: String::new(),
        job_type: JobType::Scheduled,
        command: "echo hi".to_string(),
        periodic_config: None,
        scheduled_config: Some(ScheduledConfig { scheduled_time_ms }),
        notify_enabled: false,
        notify_target: String::new(),
        save_result: false,
        result_dir: None,
    }
}

/// A successful execution record starting at `start`.
pub fn ok_record(start: u64) -> ExecutionRecord {
    ExecutionRecord {
        start_time: start,
        end_time: start + 1_000,
        success: true,
        error: None,
        result_file_path: None,
        duration: 1_000,
    }
}

/// A failed execution record starting at `start`.
pub fn failed_record(start: u64, error: &str) -> ExecutionRecord {
    ExecutionRecord {
        start_time: start,
        end_time: start + 1_000,
        success: false,
        error: Some(error.to_string()),
        result_file_path: None,
        duration: 1_000,
    }
}
