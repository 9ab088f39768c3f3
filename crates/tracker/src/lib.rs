// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gofer-tracker: turns the supervisor's fine-grained event stream into a
//! small number of user-visible messages, and owns the dashboard's view
//! of live tasks.
//!
//! Classification is table-driven: the ~60 milestone patterns are data,
//! not control flow. Forwarding is gated by an anti-flood window, a
//! per-task heartbeat keeps silent tasks visibly alive, and an orphan
//! reaper heals tasks whose supervising timer disappeared.

mod classify;
mod dashboard;
mod format;
mod tracker;

pub use classify::{strip_ansi, Classifier, EventClass};
pub use dashboard::{DashboardState, DashboardStore};
pub use format::{format_flush, format_smart, truncate_at_boundary, TRUNCATION_MARKER};
pub use tracker::{ProgressTracker, TrackerConfig, SPINNER_FRAMES};
