// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON document I/O shared by both stores.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Errors from document persistence.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.display().to_string(), source }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json { path: path.display().to_string(), source }
    }
}

/// Serialize `value` and write it to `path` via a temp-file sibling plus
/// rename, so readers never observe a torn document.
pub fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| PersistError::json(path, e))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PersistError::io(parent, e))?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &json).map_err(|e| PersistError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| PersistError::io(path, e))?;
    Ok(())
}

/// Read and parse a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistError> {
    let bytes = std::fs::read(path).map_err(|e| PersistError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| PersistError::json(path, e))
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
