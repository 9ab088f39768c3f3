// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gofer-engine: scheduled execution of stored jobs.
//!
//! The [`TaskRunner`] turns one [`Job`](gofer_core::Job) into one child
//! process and one [`ExecutionRecord`](gofer_core::ExecutionRecord); the
//! [`Scheduler`] owns the heartbeat loop that claims due jobs, enforces
//! the concurrency cap, revives zombies, and records history.

mod result_file;
mod runner;
mod scheduler;

pub use result_file::{format_result_file, result_file_name, sanitize_file_stem};
pub use runner::{RunnerConfig, TaskRunner};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerError, SchedulerState};
