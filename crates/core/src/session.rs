// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identity for per-conversation FIFO ordering.
//!
//! Requests from the same chat session must execute strictly in arrival
//! order; the [`SessionKey`] is the serialization unit. Group chats share
//! one key per group, direct chats one key per user.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Correlation id for one gateway request.
    ///
    /// Always freshly generated — never the model CLI's own session id,
    /// which must not be reused across child processes (reuse causes lock
    /// conflicts inside the CLI).
    pub struct RequestId("req-");
}

/// Serialization key for a chat session: `group_<id>` or `user_<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(user_id: &str, group_id: Option<&str>) -> Self {
        match group_id {
            Some(group) => Self(format!("group_{group}")),
            None => Self(format!("user_{user_id}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
