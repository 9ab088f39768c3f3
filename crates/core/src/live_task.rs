// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transient dashboard model of an in-flight or recently finished request.

use serde::{Deserialize, Serialize};

/// Cap on retained milestones per live task.
pub const MAX_MILESTONES: usize = 20;

/// Characters of the originating prompt surfaced on the dashboard.
pub const PROMPT_PREVIEW_CHARS: usize = 50;

/// Status of a live task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveStatus {
    Running,
    Completed,
    Error,
}

crate::simple_display! {
    LiveStatus {
        Running => "running",
        Completed => "completed",
        Error => "error",
    }
}

/// Classification of a recorded milestone entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneKind {
    Milestone,
    Progress,
    Error,
}

/// One recorded activity entry on a live task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub timestamp: u64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: MilestoneKind,
}

/// In-memory record of an in-flight or recently finished execution,
/// surfaced on the dashboard and persisted via snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveTask {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// First [`PROMPT_PREVIEW_CHARS`] characters of the originating prompt.
    pub prompt: String,
    pub start_time: u64,
    pub elapsed: u64,
    pub status: LiveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub milestones: Vec<Milestone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
}

impl LiveTask {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        group_id: Option<String>,
        prompt: &str,
        start_time: u64,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            group_id,
            prompt: prompt_preview(prompt),
            start_time,
            elapsed: 0,
            status: LiveStatus::Running,
            output: None,
            milestones: Vec::new(),
            completed_at: None,
        }
    }

    /// Append a milestone, dropping the oldest entries beyond the cap.
    pub fn push_milestone(&mut self, milestone: Milestone) {
        self.milestones.push(milestone);
        if self.milestones.len() > MAX_MILESTONES {
            let excess = self.milestones.len() - MAX_MILESTONES;
            self.milestones.drain(..excess);
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == LiveStatus::Running
    }

    /// Transition to a terminal status, fixing elapsed and completion time.
    pub fn finish(&mut self, status: LiveStatus, output: Option<String>, now_ms: u64) {
        self.status = status;
        self.output = output;
        self.elapsed = now_ms.saturating_sub(self.start_time);
        self.completed_at = Some(now_ms);
    }
}

/// Truncate a prompt to its dashboard preview, respecting char boundaries.
pub fn prompt_preview(prompt: &str) -> String {
    prompt.chars().take(PROMPT_PREVIEW_CHARS).collect()
}

/// Aggregate dashboard counters.
///
/// Invariant: after every mutation of the live-task map, `running_tasks`,
/// `completed_tasks`, and `total_tasks` equal the counts derived from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tasks: usize,
    pub running_tasks: usize,
    pub completed_tasks: usize,
    pub uptime: u64,
    pub start_time: u64,
}

crate::builder! {
    pub struct LiveTaskBuilder => LiveTask {
        into {
            id: String = "req-test",
            user_id: String = "42",
            prompt: String = "test prompt",
        }
        set {
            start_time: u64 = 1_000_000,
            elapsed: u64 = 0,
            status: LiveStatus = LiveStatus::Running,
        }
        option {
            group_id: String = None,
            output: String = None,
            completed_at: u64 = None,
        }
        computed {
            milestones: Vec<Milestone> = Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "live_task_tests.rs"]
mod tests;
