// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from egress operations
#[derive(Debug, Error)]
pub enum EgressError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Where a message or file should be delivered.
///
/// A set `group_id` addresses the group conversation; otherwise the
/// user's direct conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryTarget {
    pub user_id: String,
    pub group_id: Option<String>,
}

impl DeliveryTarget {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), group_id: None }
    }

    pub fn group(user_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), group_id: Some(group_id.into()) }
    }
}

impl std::fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.group_id {
            Some(group) => write!(f, "group_{group}"),
            None => write!(f, "user_{}", self.user_id),
        }
    }
}

/// Capability to deliver a text message to a chat conversation.
#[async_trait]
pub trait SendMessage: Send + Sync + 'static {
    async fn send_message(&self, target: &DeliveryTarget, text: &str) -> Result<(), EgressError>;
}

/// Capability to deliver a file to a chat conversation.
#[async_trait]
pub trait SendFile: Send + Sync + 'static {
    async fn send_file(&self, target: &DeliveryTarget, path: &Path) -> Result<(), EgressError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{DeliveryTarget, EgressError, SendFile, SendMessage};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    /// Recorded message delivery
    #[derive(Debug, Clone)]
    pub struct SentMessage {
        pub target: DeliveryTarget,
        pub text: String,
    }

    /// Recorded file delivery
    #[derive(Debug, Clone)]
    pub struct SentFile {
        pub target: DeliveryTarget,
        pub path: PathBuf,
    }

    #[derive(Default)]
    struct FakeChatState {
        messages: Vec<SentMessage>,
        files: Vec<SentFile>,
    }

    /// Fake chat adapter recording every delivery for assertions.
    #[derive(Clone, Default)]
    pub struct FakeChatAdapter {
        inner: Arc<Mutex<FakeChatState>>,
    }

    impl FakeChatAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// All recorded message deliveries
        pub fn messages(&self) -> Vec<SentMessage> {
            self.inner.lock().messages.clone()
        }

        /// All recorded file deliveries
        pub fn files(&self) -> Vec<SentFile> {
            self.inner.lock().files.clone()
        }
    }

    #[async_trait]
    impl SendMessage for FakeChatAdapter {
        async fn send_message(
            &self,
            target: &DeliveryTarget,
            text: &str,
        ) -> Result<(), EgressError> {
            self.inner
                .lock()
                .messages
                .push(SentMessage { target: target.clone(), text: text.to_string() });
            Ok(())
        }
    }

    #[async_trait]
    impl SendFile for FakeChatAdapter {
        async fn send_file(&self, target: &DeliveryTarget, path: &Path) -> Result<(), EgressError> {
            self.inner
                .lock()
                .files
                .push(SentFile { target: target.clone(), path: path.to_path_buf() });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeChatAdapter, SentFile, SentMessage};

#[cfg(test)]
#[path = "egress_tests.rs"]
mod tests;
