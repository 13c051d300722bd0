// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use fleet_adapters::FakeRPCClient;
use fleet_core::{ConfigSnapshot, HostInventory, SystemClock};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::*;

fn snapshot(svc_poll_interval_secs: u64) -> ConfigSnapshot {
    ConfigSnapshot {
        task_notification_enabled: true,
        os_inventory_enabled: true,
        svc_poll_interval_secs,
        project_id: "p".to_string(),
        instance_name: "i".to_string(),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn inventory_loop_reports_after_first_jitter_window_and_on_subsequent_ticks() {
    let rpc = FakeRPCClient::new();
    let (_tx, rx) = watch::channel(snapshot(60));
    let cancel = CancellationToken::new();

    let rpc_handle: Arc<dyn RPCClient> = Arc::new(rpc.clone());
    let handles = PeriodicSupervisor::spawn(PeriodicSupervisorArgs {
        clock: SystemClock,
        rpc: rpc_handle,
        inventory: Arc::new(Mutex::new(HostInventory { os_short_name: "debian".to_string(), ..Default::default() })),
        config_rx: rx,
        restart_marker_path: std::path::PathBuf::from("/nonexistent/marker"),
        cancel: cancel.clone(),
        restart_requested: Arc::new(std::sync::atomic::AtomicBool::new(false)),
    });

    // Let every spawned task actually start running before advancing time.
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_secs(310)).await;
    tokio::task::yield_now().await;

    assert!(!rpc.inventory_reports().is_empty());

    cancel.cancel();
    for h in handles {
        let _ = h.await;
    }
}

#[tokio::test(start_paused = true)]
async fn restart_marker_presence_cancels_and_sets_the_flag() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("restart-required");

    let rpc = FakeRPCClient::new();
    let (_tx, rx) = watch::channel(snapshot(600));
    let cancel = CancellationToken::new();
    let restart_requested = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let rpc_handle: Arc<dyn RPCClient> = Arc::new(rpc);
    let handles = PeriodicSupervisor::spawn(PeriodicSupervisorArgs {
        clock: SystemClock,
        rpc: rpc_handle,
        inventory: Arc::new(Mutex::new(HostInventory::default())),
        config_rx: rx,
        restart_marker_path: marker.clone(),
        cancel: cancel.clone(),
        restart_requested: Arc::clone(&restart_requested),
    });

    std::fs::write(&marker, b"").unwrap();

    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_secs(601)).await;
    tokio::task::yield_now().await;

    assert!(cancel.is_cancelled());
    assert!(restart_requested.load(std::sync::atomic::Ordering::SeqCst));

    for h in handles {
        let _ = h.await;
    }
}
