// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time abstraction so tickers, backoff, and jitter are testable without sleeping.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source, injected everywhere a component needs "now" or a delay,
/// rather than calling `Instant::now()` / `tokio::time::sleep` directly from
/// business logic.
#[async_trait]
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Suspend the caller for `dur`. Takes `&self` (not a free function) so
    /// `FakeClock` can resolve sleeps instantly in tests.
    async fn sleep(&self, dur: Duration);
}

/// Production clock backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await;
    }
}

/// Deterministic clock for tests: `now()` is a fixed epoch plus whatever has
/// been `advance`d; `sleep` resolves immediately rather than blocking the
/// test for real wall-clock time.
#[derive(Debug, Clone)]
pub struct FakeClock {
    base: Instant,
    offset_ms: Arc<AtomicU64>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move the fake clock forward. Does not actually suspend anything.
    pub fn advance(&self, dur: Duration) {
        self.offset_ms
            .fetch_add(dur.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }

    async fn sleep(&self, dur: Duration) {
        self.advance(dur);
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
