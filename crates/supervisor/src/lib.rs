// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gofer-supervisor: one chat request → one model-CLI child process.
//!
//! The supervisor owns three responsibilities:
//!
//! - spawning the CLI with a sanitized environment and the stream-json
//!   output mode, feeding the prompt over stdin
//! - decoding the line-delimited event stream incrementally, keeping
//!   partial lines across reads and never discarding unparseable bytes
//! - serializing requests per chat session: within one [`SessionKey`],
//!   a child never starts before the previous child has closed
//!
//! [`SessionKey`]: gofer_core::SessionKey

mod queue;
mod stream;
mod supervisor;

pub use queue::{QueueError, SessionQueues};
pub use stream::StreamParser;
pub use supervisor::{
    SessionError, SessionRequest, SessionSupervisor, SessionUpdate, SupervisorConfig,
};
