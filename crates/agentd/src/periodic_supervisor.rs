// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `PeriodicSupervisor` (§4.6): first-inventory jitter, interval ticks,
//! registration refresh, and the restart-marker watcher that requests
//! graceful shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use fleet_adapters::RPCClient;
use fleet_core::{jitter, Clock, ConfigSnapshot, HostInventory, InventoryReport};

/// Everything `PeriodicSupervisor` needs that is not already captured by
/// the config snapshot it subscribes to.
pub struct PeriodicSupervisorArgs<C: Clock> {
    pub clock: C,
    pub rpc: Arc<dyn RPCClient>,
    pub inventory: Arc<Mutex<HostInventory>>,
    pub config_rx: watch::Receiver<ConfigSnapshot>,
    pub restart_marker_path: PathBuf,
    pub cancel: CancellationToken,
    /// Set when the restart marker fires, so the caller can distinguish a
    /// restart-requested shutdown (exit code 2) from a signal-driven one.
    pub restart_requested: Arc<std::sync::atomic::AtomicBool>,
}

/// Owns the three steady-state tickers named in §4.6. Each runs
/// independently to completion per tick; a failure in one never blocks
/// another (§9 "independent: each runs to completion per tick").
pub struct PeriodicSupervisor;

impl PeriodicSupervisor {
    /// Spawn all three tickers. Returns their join handles so the service
    /// loop can `tokio::select!` on cancellation without leaking tasks.
    pub fn spawn<C: Clock>(args: PeriodicSupervisorArgs<C>) -> Vec<tokio::task::JoinHandle<()>> {
        let PeriodicSupervisorArgs { clock, rpc, inventory, config_rx, restart_marker_path, cancel, restart_requested } = args;

        let mut handles = Vec::new();

        handles.push(tokio::spawn(inventory_loop(
            clock.clone(),
            Arc::clone(&rpc),
            Arc::clone(&inventory),
            config_rx.clone(),
            cancel.clone(),
        )));

        handles.push(tokio::spawn(registration_refresh_loop(
            clock.clone(),
            Arc::clone(&rpc),
            config_rx,
            cancel.clone(),
        )));

        handles.push(tokio::spawn(restart_marker_loop(
            clock,
            restart_marker_path,
            restart_requested,
            cancel,
        )));

        handles
    }
}

/// First inventory fires on `uniform(180s, 300s)` after start, or the first
/// tick, whichever is first; subsequent reports follow `SvcPollInterval`.
async fn inventory_loop<C: Clock>(
    clock: C,
    rpc: Arc<dyn RPCClient>,
    inventory: Arc<Mutex<HostInventory>>,
    config_rx: watch::Receiver<ConfigSnapshot>,
    cancel: CancellationToken,
) {
    let (lo, hi) = crate::env::first_inventory_jitter_window();
    let first_delay = jitter::uniform(lo, hi);

    let tick_interval = {
        let secs = config_rx.borrow().svc_poll_interval_secs.max(1);
        std::time::Duration::from_secs(secs)
    };

    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = clock.sleep(first_delay) => {}
        _ = clock.sleep(tick_interval) => {}
    }

    loop {
        if cancel.is_cancelled() {
            return;
        }

        let snapshot = config_rx.borrow().clone();
        if snapshot.os_inventory_enabled {
            let host = inventory.lock().clone();
            let report = InventoryReport { host, collected_at_unix_ms: 0, ..Default::default() };
            if let Err(e) = rpc.report_inventory(&report).await {
                // §7: "failure is logged, not retried locally (the next
                // periodic tick will retry)".
                tracing::warn!(error = %e, "periodic supervisor: inventory report failed");
            }
        }

        let interval = std::time::Duration::from_secs(config_rx.borrow().svc_poll_interval_secs.max(1));
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = clock.sleep(interval) => {}
        }
    }
}

/// Re-registers every 24 hours while task-notification or guest-policies is
/// enabled (§4.6).
async fn registration_refresh_loop<C: Clock>(
    clock: C,
    rpc: Arc<dyn RPCClient>,
    config_rx: watch::Receiver<ConfigSnapshot>,
    cancel: CancellationToken,
) {
    let interval = crate::env::registration_refresh_interval();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = clock.sleep(interval) => {}
        }

        let snapshot = config_rx.borrow().clone();
        if !snapshot.task_notification_enabled && !snapshot.guest_policies_enabled {
            continue;
        }

        if let Err(e) = rpc.register(&snapshot.project_id, &snapshot.instance_name).await {
            tracing::warn!(error = %e, "periodic supervisor: registration refresh failed");
        } else {
            tracing::info!("periodic supervisor: registration refreshed");
        }
    }
}

/// Polls for the restart marker every 10 minutes (§4.6). Its mere presence
/// requests a graceful exit; the actual drain/cleanup/exit sequence is
/// driven by `ServiceLoop` once `cancel` fires.
async fn restart_marker_loop<C: Clock>(
    clock: C,
    marker_path: PathBuf,
    restart_requested: Arc<std::sync::atomic::AtomicBool>,
    cancel: CancellationToken,
) {
    let interval = crate::env::restart_marker_poll_interval();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = clock.sleep(interval) => {}
        }

        if marker_path.exists() {
            tracing::info!(path = %marker_path.display(), "periodic supervisor: restart marker present, requesting shutdown");
            restart_requested.store(true, std::sync::atomic::Ordering::SeqCst);
            cancel.cancel();
            return;
        }
    }
}

#[cfg(test)]
#[path = "periodic_supervisor_tests.rs"]
mod tests;
