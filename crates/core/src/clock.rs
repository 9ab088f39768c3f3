// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! The gateway measures time two ways: epoch milliseconds drive schedule
//! math and persisted timestamps, monotonic instants drive execution
//! durations. Both views come from this trait so heartbeats, throttle
//! windows, and snapshot cadences can be tested without real wall time.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    /// Epoch milliseconds, for schedules and persisted timestamps.
    fn epoch_ms(&self) -> u64;
    /// Monotonic instant, for measuring durations.
    fn now(&self) -> Instant;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Both time views of the fake clock, guarded together.
///
/// Invariant: a single `advance_ms` moves epoch and instant by the same
/// amount, so a duration measured across an advance always agrees with
/// the epoch delta the scheduler computed from it.
struct FakeNow {
    epoch_ms: u64,
    instant: Instant,
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeNow>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeNow {
                epoch_ms: 1_000_000,
                instant: Instant::now(),
            })),
        }
    }

    /// Advance both time views by the given number of milliseconds
    pub fn advance_ms(&self, ms: u64) {
        let mut now = self.inner.lock();
        now.epoch_ms += ms;
        now.instant += Duration::from_millis(ms);
    }

    /// Set the epoch milliseconds value
    pub fn set_epoch_ms(&self, ms: u64) {
        self.inner.lock().epoch_ms = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }

    fn now(&self) -> Instant {
        self.inner.lock().instant
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
