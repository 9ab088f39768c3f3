// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gofer-adapters: capability interfaces to the chat channel.
//!
//! The gateway never talks to a chat platform directly. The scheduler and
//! the progress tracker are handed these two small capabilities at
//! construction time; the real adapter lives outside this workspace.

mod egress;

pub use egress::{DeliveryTarget, EgressError, SendFile, SendMessage};

#[cfg(any(test, feature = "test-support"))]
pub use egress::{FakeChatAdapter, SentFile, SentMessage};
