// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task progress state: throttled smart sends, liveness heartbeats,
//! and the orphan reaper.

use crate::classify::{Classifier, EventClass};
use crate::dashboard::DashboardState;
use crate::format::{format_flush, format_smart};
use gofer_adapters::{DeliveryTarget, SendMessage};
use gofer_core::{
    format_elapsed_ms, Clock, LiveStatus, LiveTask, Milestone, MilestoneKind, SessionKey,
    SystemClock,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Fixed spinner cycle for heartbeat lines.
pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Tracker construction parameters.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Anti-flood window for milestone/error forwards.
    pub smart_trigger_interval_ms: u64,
    /// Heartbeat cadence per running task.
    pub heartbeat_interval_ms: u64,
    /// A heartbeat is suppressed when a smart send fired this recently.
    pub heartbeat_suppress_ms: u64,
    /// Cap on flushed message length, in characters.
    pub max_message_chars: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            smart_trigger_interval_ms: 2_000,
            heartbeat_interval_ms: 20_000,
            heartbeat_suppress_ms: 5_000,
            max_message_chars: 1_900,
        }
    }
}

struct TaskState {
    user_id: String,
    group_id: Option<String>,
    session_key: SessionKey,
    start_ms: u64,
    buffer: Vec<(EventClass, String)>,
    last_smart_send_ms: Option<u64>,
    last_milestone: Option<String>,
    spinner_index: usize,
    heartbeat: Option<JoinHandle<()>>,
}

impl TaskState {
    fn target(&self) -> DeliveryTarget {
        DeliveryTarget { user_id: self.user_id.clone(), group_id: self.group_id.clone() }
    }
}

/// Event classifier, throttle, heartbeat emitter, and orphan reaper.
pub struct ProgressTracker<C: Clock = SystemClock> {
    config: TrackerConfig,
    clock: C,
    classifier: Arc<Classifier>,
    dashboard: Arc<DashboardState<C>>,
    egress: Arc<dyn SendMessage>,
    tasks: Arc<Mutex<HashMap<String, TaskState>>>,
    /// Active task per session, for per-user task coherence.
    sessions: Arc<Mutex<HashMap<SessionKey, String>>>,
}

impl<C: Clock> Clone for ProgressTracker<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            clock: self.clock.clone(),
            classifier: Arc::clone(&self.classifier),
            dashboard: Arc::clone(&self.dashboard),
            egress: Arc::clone(&self.egress),
            tasks: Arc::clone(&self.tasks),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl<C: Clock> ProgressTracker<C> {
    pub fn new(
        config: TrackerConfig,
        dashboard: Arc<DashboardState<C>>,
        egress: Arc<dyn SendMessage>,
        clock: C,
    ) -> Self {
        Self {
            config,
            clock,
            classifier: Arc::new(Classifier::new()),
            dashboard,
            egress,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Begin tracking a request: registers the live task, arms its
    /// heartbeat, and cancels the heartbeat of any prior task under the
    /// same session key.
    pub fn start_task(
        &self,
        id: &str,
        user_id: &str,
        group_id: Option<String>,
        prompt: &str,
    ) {
        let session_key = SessionKey::new(user_id, group_id.as_deref());
        let now = self.clock.epoch_ms();

        // Per-session coherence: one heartbeat per session.
        let displaced = self.sessions.lock().insert(session_key.clone(), id.to_string());
        if let Some(prior) = displaced {
            if prior != id {
                if let Some(state) = self.tasks.lock().get_mut(&prior) {
                    if let Some(handle) = state.heartbeat.take() {
                        handle.abort();
                        tracing::debug!(task = %prior, "prior task heartbeat cancelled");
                    }
                }
            }
        }

        self.dashboard
            .upsert_task(LiveTask::new(id, user_id, group_id.clone(), prompt, now));

        let state = TaskState {
            user_id: user_id.to_string(),
            group_id,
            session_key,
            start_ms: now,
            buffer: Vec::new(),
            last_smart_send_ms: None,
            last_milestone: None,
            spinner_index: 0,
            heartbeat: None,
        };
        self.tasks.lock().insert(id.to_string(), state);

        let this = self.clone();
        let task_id = id.to_string();
        let interval = Duration::from_millis(self.config.heartbeat_interval_ms);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                this.heartbeat_tick(&task_id).await;
            }
        });
        if let Some(state) = self.tasks.lock().get_mut(id) {
            state.heartbeat = Some(handle);
        } else {
            // The task ended before the handle landed.
            handle.abort();
        }
    }

    /// Consume one progress chunk: classify, record, maybe forward.
    pub async fn on_progress(&self, id: &str, chunk: &str) {
        let lines = self.classifier.classify_chunk(chunk);
        if lines.is_empty() {
            return;
        }
        let now = self.clock.epoch_ms();

        let to_send = {
            let mut tasks = self.tasks.lock();
            let Some(state) = tasks.get_mut(id) else {
                tracing::debug!(task = %id, "progress for unknown task dropped");
                return;
            };
            state.buffer.extend(lines.iter().cloned());

            // First smart line of the chunk decides the forward.
            let smart = lines.iter().find(|(class, _)| *class != EventClass::Update);
            smart.and_then(|(class, line)| {
                state.last_milestone = Some(line.clone());
                let in_window = state.last_smart_send_ms.is_some_and(|last| {
                    now.saturating_sub(last) < self.config.smart_trigger_interval_ms
                });
                if in_window {
                    // Recorded, not forwarded.
                    None
                } else {
                    state.last_smart_send_ms = Some(now);
                    Some((state.target(), format_smart(*class, line)))
                }
            })
        };

        // Milestones and errors land on the dashboard even when throttled.
        for (class, line) in &lines {
            let kind = match class {
                EventClass::Error => MilestoneKind::Error,
                EventClass::Milestone => MilestoneKind::Milestone,
                EventClass::Update => continue,
            };
            self.dashboard.with_task(id, |task| {
                task.push_milestone(Milestone {
                    timestamp: now,
                    message: line.clone(),
                    kind,
                });
            });
        }

        if let Some((target, text)) = to_send {
            if let Err(error) = self.egress.send_message(&target, &text).await {
                tracing::warn!(task = %id, %error, "smart send failed");
            }
        }
    }

    /// One heartbeat for one task. Returns whether a line was emitted.
    ///
    /// Called by the armed timer; public so tests can drive it with a
    /// fake clock.
    pub async fn heartbeat_tick(&self, id: &str) -> bool {
        let now = self.clock.epoch_ms();
        let emitted = {
            let mut tasks = self.tasks.lock();
            let Some(state) = tasks.get_mut(id) else {
                return false;
            };
            let recently_smart = state.last_smart_send_ms.is_some_and(|last| {
                now.saturating_sub(last) < self.config.heartbeat_suppress_ms
            });
            if recently_smart {
                None
            } else {
                let frame = SPINNER_FRAMES[state.spinner_index % SPINNER_FRAMES.len()];
                state.spinner_index += 1;
                let elapsed = format_elapsed_ms(now.saturating_sub(state.start_ms));
                Some((state.target(), format!("{frame} 任务执行中... {elapsed}")))
            }
        };
        match emitted {
            Some((target, text)) => {
                if let Err(error) = self.egress.send_message(&target, &text).await {
                    tracing::warn!(task = %id, %error, "heartbeat send failed");
                }
                true
            }
            None => false,
        }
    }

    /// Finish a task successfully.
    pub fn end_task(&self, id: &str, final_output: &str) {
        self.teardown(id);
        let now = self.clock.epoch_ms();
        self.dashboard.with_task(id, |task| {
            task.finish(LiveStatus::Completed, Some(final_output.to_string()), now);
        });
    }

    /// Finish a task with an error.
    pub fn fail_task(&self, id: &str, error: &str) {
        self.teardown(id);
        let now = self.clock.epoch_ms();
        self.dashboard.with_task(id, |task| {
            task.finish(LiveStatus::Error, Some(error.to_string()), now);
        });
    }

    /// Drain the buffered lines into one deduped, bounded message.
    pub fn flush_buffer(&self, id: &str) -> Option<String> {
        let buffered = {
            let mut tasks = self.tasks.lock();
            let state = tasks.get_mut(id)?;
            std::mem::take(&mut state.buffer)
        };
        format_flush(&buffered, self.config.max_message_chars)
    }

    /// Heal running live tasks whose heartbeat timer is gone.
    ///
    /// Age is never a signal: a long-running task with a live timer is
    /// healthy. Returns how many tasks were reaped.
    pub fn cleanup_zombie_tasks(&self) -> usize {
        let now = self.clock.epoch_ms();
        let with_timer: std::collections::HashSet<String> = self
            .tasks
            .lock()
            .iter()
            .filter(|(_, state)| state.heartbeat.is_some())
            .map(|(id, _)| id.clone())
            .collect();

        let mut reaped = 0;
        for task in self.dashboard.running_tasks() {
            if with_timer.contains(&task.id) {
                continue;
            }
            tracing::warn!(task = %task.id, "reaping orphan task without heartbeat");
            self.dashboard.with_task(&task.id, |task| {
                task.finish(
                    LiveStatus::Error,
                    Some("process terminated without heartbeat".to_string()),
                    now,
                );
            });
            reaped += 1;
        }
        reaped
    }

    /// Most recent milestone text recorded for a task.
    pub fn last_milestone(&self, id: &str) -> Option<String> {
        self.tasks.lock().get(id).and_then(|state| state.last_milestone.clone())
    }

    fn teardown(&self, id: &str) {
        let state = self.tasks.lock().remove(id);
        if let Some(mut state) = state {
            if let Some(handle) = state.heartbeat.take() {
                handle.abort();
            }
            let mut sessions = self.sessions.lock();
            if sessions.get(&state.session_key).is_some_and(|current| current == id) {
                sessions.remove(&state.session_key);
            }
        }
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
