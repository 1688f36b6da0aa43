// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so timers, ETAs, and timestamps are deterministic in tests.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A source of time. `Instant` for monotonic durations (stage timeouts,
/// EMA windows), `epoch_ms` for wall-clock timestamps surfaced in the data
/// model (`started_at`, `ended_at`).
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    fn epoch_ms(&self) -> u64;
}

/// Real clock backed by the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Fake clock for deterministic tests. Starts at an arbitrary fixed instant
/// and only advances when told to via [`FakeClock::advance`].
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

struct FakeClockState {
    now: Instant,
    epoch_ms: u64,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                now: Instant::now(),
                epoch_ms: 1_700_000_000_000,
            })),
        }
    }

    pub fn advance(&self, d: Duration) {
        let mut state = self.inner.lock();
        state.now += d;
        state.epoch_ms += d.as_millis() as u64;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
