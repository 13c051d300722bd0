// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Long-poll timeout for the config metadata client (default: 55000ms, kept
/// under most load balancers' 60s idle cutoff).
pub fn metadata_longpoll_ms() -> Duration {
    parse_duration_ms("FLEET_METADATA_LONGPOLL_MS").unwrap_or(Duration::from_millis(55_000))
}

/// Fallback poll interval used when the metadata client falls back to
/// short-polling after a long-poll error (default: 5000ms).
pub fn metadata_fallback_poll_ms() -> Duration {
    parse_duration_ms("FLEET_METADATA_FALLBACK_POLL_MS").unwrap_or(Duration::from_secs(5))
}

/// Maximum size accepted for a fetched GPG key or repository file, in bytes
/// (default: 1 MiB). Protects the agent from an unbounded download.
pub fn max_fetch_bytes() -> u64 {
    std::env::var("FLEET_MAX_FETCH_BYTES")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1024 * 1024)
}
