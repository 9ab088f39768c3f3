// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway configuration document.
//!
//! One JSON file, shallow-merged by `PUT /api/config` and rewritten
//! atomically. Unknown keys are rejected at the type level so a typo in
//! a PUT body fails loudly instead of silently doing nothing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from configuration handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("config merge body must be a JSON object")]
    NotAnObject,
}

/// Runtime-tunable gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// HTTP control plane bind address.
    pub http_addr: String,
    /// Root directory for dashboard static assets; none disables serving.
    pub static_root: Option<PathBuf>,
    /// Model CLI binary.
    pub cli_path: String,
    /// Pass `--dangerously-skip-permissions` on every invocation.
    pub skip_permissions: bool,
    /// Interactive request timeout in milliseconds; 0 disables.
    pub session_timeout_ms: u64,
    /// Scheduled job timeout in milliseconds; 0 disables.
    pub task_timeout_ms: u64,
    /// Cumulative stdout cap per job, in bytes.
    pub max_result_file_size: usize,
    /// Default directory for saved job results.
    pub result_dir: PathBuf,
    /// Scheduler heartbeat cadence in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Cap on concurrently running scheduled jobs.
    pub max_concurrent: usize,
    /// Anti-flood window for progress forwards, in milliseconds.
    pub smart_trigger_interval_ms: u64,
    /// Dashboard snapshot cadence in milliseconds.
    pub auto_snapshot_interval_ms: u64,
    /// Cap on retained execution records per job.
    pub max_history: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8120".to_string(),
            static_root: None,
            cli_path: "claude".to_string(),
            skip_permissions: true,
            session_timeout_ms: 0,
            task_timeout_ms: 600_000,
            max_result_file_size: 10 * 1024 * 1024,
            result_dir: PathBuf::from("task-results"),
            heartbeat_interval_ms: 5_000,
            max_concurrent: 2,
            smart_trigger_interval_ms: 2_000,
            auto_snapshot_interval_ms: 60_000,
            max_history: 100,
        }
    }
}

/// Handle on the persisted configuration document.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document; a missing file yields defaults.
    pub fn load(&self) -> Result<GatewayConfig, ConfigError> {
        if !self.path.exists() {
            return Ok(GatewayConfig::default());
        }
        let bytes = std::fs::read(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Atomically rewrite the document.
    pub fn save(&self, config: &GatewayConfig) -> Result<(), ConfigError> {
        let json = serde_json::to_vec_pretty(config)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &json).map_err(|source| ConfigError::Io {
            path: tmp.display().to_string(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    /// Shallow-merge a JSON object into the document, validate, persist,
    /// and return the merged config.
    pub fn merge(&self, patch: serde_json::Value) -> Result<GatewayConfig, ConfigError> {
        let serde_json::Value::Object(patch) = patch else {
            return Err(ConfigError::NotAnObject);
        };
        let current = self.load()?;
        let mut document = serde_json::to_value(&current)?;
        let Some(object) = document.as_object_mut() else {
            return Err(ConfigError::NotAnObject);
        };
        for (key, value) in patch {
            object.insert(key, value);
        }
        let merged: GatewayConfig = serde_json::from_value(document)?;
        self.save(&merged)?;
        Ok(merged)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
