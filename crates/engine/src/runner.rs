// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process executor for stored jobs.
//!
//! Unlike the interactive supervisor, the runner is strict: a non-zero
//! exit is a failed execution. Every failure mode folds into an
//! [`ExecutionRecord`] with a human-readable error — nothing escapes this
//! boundary as an error type.

use crate::result_file::{format_result_file, result_file_name};
use chrono::{Local, TimeZone};
use gofer_core::{sanitized_process_env, Clock, ExecutionRecord, Job, JobId, SystemClock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;

/// Runner construction parameters.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Model CLI binary (name resolved via PATH, or an absolute path).
    pub cli_path: String,
    /// Prepend `--dangerously-skip-permissions` when the job command
    /// doesn't already carry it.
    pub skip_permissions: bool,
    /// Hard per-job timeout in milliseconds; 0 disables.
    pub task_timeout_ms: u64,
    /// Cumulative stdout cap in bytes; the child is killed beyond it.
    pub max_output_bytes: usize,
    /// Default directory for saved result files.
    pub result_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cli_path: "claude".to_string(),
            skip_permissions: true,
            task_timeout_ms: 600_000,
            max_output_bytes: 10 * 1024 * 1024,
            result_dir: PathBuf::from("task-results"),
        }
    }
}

enum RunFailure {
    Timeout,
    OutputTooLarge,
    Canceled,
    Io(std::io::Error),
}

/// Spawns one child per job, enforcing timeout and output-size caps.
///
/// Running children are registered by job id so an external cancel
/// (delete, scheduler shutdown) can terminate them.
pub struct TaskRunner<C: Clock = SystemClock> {
    config: RunnerConfig,
    clock: C,
    running: Arc<Mutex<HashMap<JobId, oneshot::Sender<()>>>>,
}

impl TaskRunner<SystemClock> {
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> TaskRunner<C> {
    pub fn with_clock(config: RunnerConfig, clock: C) -> Self {
        Self { config, clock, running: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Whether a child for this job is currently registered.
    pub fn is_running(&self, id: &JobId) -> bool {
        self.running.lock().contains_key(id)
    }

    /// Terminate the child registered for `id`, if any.
    pub fn cancel(&self, id: &JobId) -> bool {
        match self.running.lock().remove(id) {
            Some(cancel) => {
                let _ = cancel.send(());
                true
            }
            None => false,
        }
    }

    /// Terminate every registered child.
    pub fn cancel_all(&self) {
        let drained: Vec<_> = {
            let mut running = self.running.lock();
            running.drain().collect()
        };
        for (id, cancel) in drained {
            tracing::warn!(job_id = %id, "force-terminating job child");
            let _ = cancel.send(());
        }
    }

    /// Execute one job to completion. Never errors across this boundary:
    /// every failure becomes a record with `success = false`.
    pub async fn execute(&self, job: &Job) -> ExecutionRecord {
        let start_ms = self.clock.epoch_ms();
        let started = self.clock.now();
        let record = |success: bool, error: Option<String>, result_file: Option<PathBuf>, clock: &C| {
            let end_ms = clock.epoch_ms();
            ExecutionRecord {
                start_time: start_ms,
                end_time: end_ms,
                success,
                error,
                result_file_path: result_file,
                duration: clock.now().duration_since(started).as_millis() as u64,
            }
        };

        let outcome = self.run(job).await;
        match outcome {
            Ok(stdout) => {
                let result_file = if job.save_result {
                    match self.save_result_file(job, start_ms, &stdout) {
                        Ok(path) => Some(path),
                        Err(error) => {
                            tracing::warn!(job_id = %job.id, %error, "result file write failed");
                            None
                        }
                    }
                } else {
                    None
                };
                tracing::info!(job_id = %job.id, name = %job.name, "job execution succeeded");
                record(true, None, result_file, &self.clock)
            }
            Err(error) => {
                tracing::warn!(job_id = %job.id, name = %job.name, %error, "job execution failed");
                record(false, Some(error), None, &self.clock)
            }
        }
    }

    /// Spawn and drive the child; resolves with trimmed stdout on exit 0.
    async fn run(&self, job: &Job) -> Result<String, String> {
        let command_line = self.build_command_line(job);
        tracing::debug!(job_id = %job.id, command = %command_line, "spawning job child");

        // The job command is a verbatim argument string, so it goes
        // through the shell rather than being tokenized here.
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&command_line)
            .env_clear()
            .envs(sanitized_process_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|error| format!("failed to start model CLI: {error}"))?;

        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        self.running.lock().insert(job.id.clone(), cancel_tx);

        let driven = drive_child(&mut child, self.config.max_output_bytes);
        let timeout_ms = self.config.task_timeout_ms;
        let outcome = tokio::select! {
            outcome = driven => outcome,
            _ = tokio::time::sleep(Duration::from_millis(timeout_ms)), if timeout_ms > 0 => {
                Err(RunFailure::Timeout)
            }
            _ = &mut cancel_rx => Err(RunFailure::Canceled),
        };
        self.running.lock().remove(&job.id);

        match outcome {
            Ok((stdout, stderr, status)) => {
                if status.success() {
                    Ok(stdout.trim().to_string())
                } else {
                    let stderr = stderr.trim();
                    if stderr.is_empty() {
                        Err(match status.code() {
                            Some(code) => format!("exited with code {code}"),
                            None => "terminated by signal".to_string(),
                        })
                    } else {
                        Err(stderr.to_string())
                    }
                }
            }
            Err(failure) => {
                let _ = child.kill().await;
                Err(match failure {
                    RunFailure::Timeout => "timeout".to_string(),
                    RunFailure::OutputTooLarge => "output too large".to_string(),
                    RunFailure::Canceled => "canceled".to_string(),
                    RunFailure::Io(error) => format!("I/O error: {error}"),
                })
            }
        }
    }

    /// `<cli> -p <command>`, with the skip-permissions flag prepended to
    /// the command string when absent.
    fn build_command_line(&self, job: &Job) -> String {
        const SKIP_FLAG: &str = "--dangerously-skip-permissions";
        let command = if self.config.skip_permissions && !job.command.contains(SKIP_FLAG) {
            format!("{SKIP_FLAG} {}", job.command)
        } else {
            job.command.clone()
        };
        format!("{} -p {}", self.config.cli_path, command)
    }

    fn save_result_file(
        &self,
        job: &Job,
        start_ms: u64,
        stdout: &str,
    ) -> Result<PathBuf, std::io::Error> {
        let dir = job.result_dir.clone().unwrap_or_else(|| self.config.result_dir.clone());
        std::fs::create_dir_all(&dir)?;
        let start = Local
            .timestamp_millis_opt(start_ms as i64)
            .single()
            .unwrap_or_else(Local::now);
        let path = dir.join(result_file_name(&job.name, start));
        std::fs::write(&path, format_result_file(job, start, Local::now(), stdout))?;
        tracing::info!(job_id = %job.id, path = %path.display(), "result file saved");
        Ok(path)
    }
}

/// Read both streams to EOF (capping stdout) and wait for exit.
async fn drive_child(
    child: &mut Child,
    max_output_bytes: usize,
) -> Result<(String, String, std::process::ExitStatus), RunFailure> {
    let mut stdout = child.stdout.take().ok_or_else(not_captured)?;
    let mut stderr = child.stderr.take().ok_or_else(not_captured)?;
    let mut stdout_text = String::new();
    let mut stderr_text = String::new();
    let mut stdout_buf = [0u8; 8192];
    let mut stderr_buf = [0u8; 8192];
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            read = stdout.read(&mut stdout_buf), if !stdout_done => {
                let n = read.map_err(RunFailure::Io)?;
                if n == 0 {
                    stdout_done = true;
                } else {
                    stdout_text.push_str(&String::from_utf8_lossy(&stdout_buf[..n]));
                    if stdout_text.len() > max_output_bytes {
                        return Err(RunFailure::OutputTooLarge);
                    }
                }
            }
            read = stderr.read(&mut stderr_buf), if !stderr_done => {
                let n = read.map_err(RunFailure::Io)?;
                if n == 0 {
                    stderr_done = true;
                } else {
                    stderr_text.push_str(&String::from_utf8_lossy(&stderr_buf[..n]));
                }
            }
        }
    }

    let status = child.wait().await.map_err(RunFailure::Io)?;
    Ok((stdout_text, stderr_text, status))
}

fn not_captured() -> RunFailure {
    RunFailure::Io(std::io::Error::other("child stdio not captured"))
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
