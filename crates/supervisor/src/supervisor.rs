// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process driver for interactive chat requests.

use crate::queue::{QueueError, SessionQueues};
use crate::stream::StreamParser;
use gofer_core::{sanitized_process_env, RequestId, SessionKey};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

/// Supervisor construction parameters.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Model CLI binary (name resolved via PATH, or an absolute path).
    pub cli_path: String,
    /// Pass `--dangerously-skip-permissions` to the CLI.
    pub skip_permissions: bool,
    /// Per-request soft timeout in milliseconds; 0 disables.
    pub timeout_ms: u64,
    /// Bound on queued requests per session.
    pub queue_capacity: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            cli_path: "claude".to_string(),
            skip_permissions: true,
            timeout_ms: 0,
            queue_capacity: 32,
        }
    }
}

/// One inbound chat request.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub request_id: RequestId,
    pub user_id: String,
    pub group_id: Option<String>,
    pub prompt: String,
}

impl SessionRequest {
    pub fn new(user_id: impl Into<String>, group_id: Option<String>, prompt: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            user_id: user_id.into(),
            group_id,
            prompt: prompt.into(),
        }
    }

    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(&self.user_id, self.group_id.as_deref())
    }
}

/// Progress emitted while a request's child is running.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub request_id: RequestId,
    pub user_id: String,
    pub group_id: Option<String>,
    pub chunk: String,
}

/// Errors from request execution.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to start model CLI: {0}")]
    SpawnFailed(String),
    #[error("model CLI timed out after {0} ms")]
    Timeout(u64),
    #[error("model CLI produced no output (exit code {code:?})")]
    NoOutput { code: Option<i32> },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("request canceled before completion")]
    Canceled,
}

/// Per-request child-process supervisor with per-session FIFO ordering.
///
/// A request resolves with the CLI's output even on a non-zero exit —
/// the chat contract prefers partial output over a bare failure. Only a
/// child that produced nothing at all (or could not be launched) errors.
pub struct SessionSupervisor {
    config: SupervisorConfig,
    queues: SessionQueues,
    updates: mpsc::Sender<SessionUpdate>,
}

impl SessionSupervisor {
    pub fn new(config: SupervisorConfig, updates: mpsc::Sender<SessionUpdate>) -> Self {
        let queues = SessionQueues::new(config.queue_capacity);
        Self { config, queues, updates }
    }

    /// Execute one request, honoring its session's FIFO order.
    ///
    /// The returned future resolves when the request's own child closes;
    /// a queued request waits for every earlier request under the same
    /// session key first.
    pub async fn execute(&self, request: SessionRequest) -> Result<String, SessionError> {
        let key = request.session_key();
        let (result_tx, result_rx) = oneshot::channel();
        let config = self.config.clone();
        let updates = self.updates.clone();

        self.queues.submit(&key, async move {
            let outcome = run_child(&config, &request, &updates).await;
            let _ = result_tx.send(outcome);
        })?;

        result_rx.await.map_err(|_| SessionError::Canceled)?
    }

    /// Sessions currently holding a live queue consumer.
    pub fn active_sessions(&self) -> usize {
        self.queues.active_sessions()
    }

    /// Children are owned by their spawning request; nothing to tear down
    /// beyond dropping references.
    pub fn cleanup(&self) {}
}

/// Spawn the CLI for one request and drive it to completion.
async fn run_child(
    config: &SupervisorConfig,
    request: &SessionRequest,
    updates: &mpsc::Sender<SessionUpdate>,
) -> Result<String, SessionError> {
    let mut command = Command::new(&config.cli_path);
    command
        .arg("--print")
        .arg("--continue")
        .arg("--output-format")
        .arg("stream-json")
        .arg("--verbose");
    if config.skip_permissions {
        command.arg("--dangerously-skip-permissions");
    }
    command
        .env_clear()
        .envs(sanitized_process_env())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|error| SessionError::SpawnFailed(error.to_string()))?;
    tracing::info!(
        request_id = %request.request_id,
        session = %request.session_key(),
        "model CLI spawned"
    );

    let driven = drive_child(&mut child, request, updates);
    let (parser, status) = if config.timeout_ms > 0 {
        match tokio::time::timeout(Duration::from_millis(config.timeout_ms), driven).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                tracing::warn!(
                    request_id = %request.request_id,
                    timeout_ms = config.timeout_ms,
                    "request timed out, killing child"
                );
                let _ = child.kill().await;
                return Err(SessionError::Timeout(config.timeout_ms));
            }
        }
    } else {
        driven.await?
    };

    if !status.success() {
        tracing::warn!(
            request_id = %request.request_id,
            exit_code = ?status.code(),
            "model CLI exited non-zero"
        );
    }
    if parser.has_output() {
        Ok(parser.into_output())
    } else {
        Err(SessionError::NoOutput { code: status.code() })
    }
}

/// Feed the prompt, decode both output streams, and wait for exit.
async fn drive_child(
    child: &mut Child,
    request: &SessionRequest,
    updates: &mpsc::Sender<SessionUpdate>,
) -> Result<(StreamParser, std::process::ExitStatus), SessionError> {
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(request.prompt.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        // Closing stdin is what triggers the CLI to start processing.
        stdin.shutdown().await?;
    }

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| SessionError::SpawnFailed("stdout not captured".to_string()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| SessionError::SpawnFailed("stderr not captured".to_string()))?;
    let mut parser = StreamParser::new();
    let mut stdout_buf = [0u8; 8192];
    let mut stderr_buf = [0u8; 8192];
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            read = stdout.read(&mut stdout_buf), if !stdout_done => {
                let n = read?;
                if n == 0 {
                    stdout_done = true;
                } else {
                    let chunk = String::from_utf8_lossy(&stdout_buf[..n]).into_owned();
                    for progress in parser.feed(&chunk) {
                        forward(updates, request, progress).await;
                    }
                }
            }
            read = stderr.read(&mut stderr_buf), if !stderr_done => {
                let n = read?;
                if n == 0 {
                    stderr_done = true;
                } else {
                    // Stderr is the CLI's primary tool-use log: mirror it
                    // into both the output and the progress stream.
                    let chunk = String::from_utf8_lossy(&stderr_buf[..n]).into_owned();
                    parser.append_stderr(&chunk);
                    forward(updates, request, chunk).await;
                }
            }
        }
    }
    for progress in parser.finish() {
        forward(updates, request, progress).await;
    }

    let status = child.wait().await?;
    Ok((parser, status))
}

async fn forward(updates: &mpsc::Sender<SessionUpdate>, request: &SessionRequest, chunk: String) {
    let update = SessionUpdate {
        request_id: request.request_id.clone(),
        user_id: request.user_id.clone(),
        group_id: request.group_id.clone(),
        chunk,
    };
    // A closed tracker side must not fail the request.
    let _ = updates.send(update).await;
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
