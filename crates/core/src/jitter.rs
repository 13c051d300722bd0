// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jittered delay helpers shared by the config watcher, RPC client backoff,
//! and the first-inventory timing in the periodic supervisor.

use rand::Rng;
use std::time::Duration;

/// Pick a uniformly random duration in `[lo, hi)`.
///
/// Used for the first-inventory jitter window (`uniform(180s, 300s)`, §4.6).
pub fn uniform(lo: Duration, hi: Duration) -> Duration {
    if hi <= lo {
        return lo;
    }
    let lo_ms = lo.as_millis() as u64;
    let hi_ms = hi.as_millis() as u64;
    let ms = rand::rng().random_range(lo_ms..hi_ms);
    Duration::from_millis(ms)
}

/// Exponential backoff with full jitter: `rand(0, min(cap, base * 2^attempt))`.
///
/// `attempt` is zero-based (the first retry passes `0`). Used by
/// `ConfigWatcher` and `RPCClient` wherever §4.2/§4.3 call for "capped
/// exponential backoff" or "jittered exponential backoff".
pub fn backoff(base: Duration, cap: Duration, attempt: u32) -> Duration {
    let exp = base.as_millis().saturating_mul(1u128 << attempt.min(32));
    let capped_ms = exp.min(cap.as_millis()) as u64;
    if capped_ms == 0 {
        return Duration::ZERO;
    }
    let ms = rand::rng().random_range(0..=capped_ms);
    Duration::from_millis(ms)
}

#[cfg(test)]
#[path = "jitter_tests.rs"]
mod tests;
