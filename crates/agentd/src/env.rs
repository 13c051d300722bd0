// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent binary.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// How often the periodic supervisor polls for the restart marker file
/// (default: 10 minutes, §4.6).
pub fn restart_marker_poll_interval() -> Duration {
    parse_duration_ms("FLEET_RESTART_MARKER_POLL_MS").unwrap_or(Duration::from_secs(600))
}

/// Registration refresh interval while task-notification or guest-policies
/// is enabled (default: 24 hours, §4.6).
pub fn registration_refresh_interval() -> Duration {
    parse_duration_ms("FLEET_REGISTRATION_REFRESH_MS").unwrap_or(Duration::from_secs(24 * 60 * 60))
}

/// Jitter window for the first inventory report after startup (default:
/// `uniform(180s, 300s)`, §4.6).
pub fn first_inventory_jitter_window() -> (Duration, Duration) {
    (Duration::from_secs(180), Duration::from_secs(300))
}

/// Total retry budget for `RegisterAgent` before the caller falls back to
/// the 5-minute forever-retry loop (default: 10 minutes, §4.3).
pub fn register_retry_budget() -> Duration {
    parse_duration_ms("FLEET_REGISTER_BUDGET_MS").unwrap_or(Duration::from_secs(600))
}

/// Sleep between `RegisterAgent` attempts once the retry budget above is
/// exhausted (default: 5 minutes, §4.3).
pub fn register_forever_retry_interval() -> Duration {
    parse_duration_ms("FLEET_REGISTER_RETRY_MS").unwrap_or(Duration::from_secs(300))
}

/// Local profiling listener address, enabled only by `--profile` (§6).
pub fn profile_listen_addr() -> &'static str {
    "127.0.0.1:6060"
}
