// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dashboard snapshot persistence with backup fallback.
//!
//! The snapshotter copies the current document to a `.backup.json`
//! sibling *before* the atomic rewrite, so a document corrupted at rest
//! still has a one-generation-old fallback. Load order is primary,
//! then backup, then empty.

use crate::persist::{read_json, write_atomic, PersistError};
use gofer_core::{DashboardStats, LiveTask};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Snapshot document version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk dashboard snapshot.
///
/// Tasks are an ordered `[id, task]` pair list — the deterministic
/// serialization of the live-task map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub version: u32,
    #[serde(rename = "savedAt")]
    pub saved_at: u64,
    pub tasks: Vec<(String, LiveTask)>,
    pub stats: DashboardStats,
}

impl DashboardSnapshot {
    pub fn new(saved_at: u64, tasks: Vec<(String, LiveTask)>, stats: DashboardStats) -> Self {
        Self { version: SNAPSHOT_VERSION, saved_at, tasks, stats }
    }
}

/// Snapshot reader/writer bound to a primary path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `dashboard-state.json` → `dashboard-state.backup.json`.
    pub fn backup_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dashboard-state".to_string());
        self.path.with_file_name(format!("{stem}.backup.json"))
    }

    /// Copy the current document to the backup sibling, then atomically
    /// write the new one.
    pub fn save(&self, snapshot: &DashboardSnapshot) -> Result<(), PersistError> {
        if self.path.exists() {
            if let Err(error) = std::fs::copy(&self.path, self.backup_path()) {
                // A failed backup copy must not block the save itself.
                tracing::warn!(path = %self.path.display(), %error, "snapshot backup copy failed");
            }
        }
        write_atomic(&self.path, snapshot)
    }

    /// Load the newest readable snapshot: primary, then backup, then none.
    pub fn load(&self) -> Option<DashboardSnapshot> {
        match self.read_versioned(&self.path) {
            Ok(snapshot) => return Some(snapshot),
            Err(error) => {
                if self.path.exists() {
                    tracing::warn!(
                        path = %self.path.display(),
                        %error,
                        "primary snapshot unreadable, trying backup"
                    );
                }
            }
        }
        let backup = self.backup_path();
        match self.read_versioned(&backup) {
            Ok(snapshot) => {
                tracing::info!(path = %backup.display(), "restored dashboard state from backup");
                Some(snapshot)
            }
            Err(error) => {
                if backup.exists() {
                    tracing::error!(
                        path = %backup.display(),
                        %error,
                        "backup snapshot unreadable, starting empty"
                    );
                }
                None
            }
        }
    }

    fn read_versioned(&self, path: &Path) -> Result<DashboardSnapshot, PersistError> {
        let snapshot: DashboardSnapshot = read_json(path)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistError::Json {
                path: path.display().to_string(),
                source: serde::de::Error::custom(format!(
                    "unsupported snapshot version {}",
                    snapshot.version
                )),
            });
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
