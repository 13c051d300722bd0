// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use fleet_adapters::{FakePackageManager, FakeRPCClient, FakeRepoWriter, FakeScriptRunner, FakeMetadataClient, NoopAccountManager};
use fleet_core::{ConfigSnapshot, HostInventory, SystemClock, Tasker};
use fleet_reconcile::{HostCaps, ResourceRegistry};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::*;

fn executor() -> TaskExecutor {
    let caps = Arc::new(HostCaps {
        package_manager: FakePackageManager::new(),
        repo_writer: FakeRepoWriter::new(),
        script_runner: FakeScriptRunner::new(),
        account_manager: Arc::new(NoopAccountManager),
        http_client: reqwest::Client::new(),
        max_fetch_bytes: 1024 * 1024,
    });
    TaskExecutor::new(
        Tasker::spawn(),
        Arc::new(ResourceRegistry::with_builtin_kinds()),
        caps,
        Arc::new(Mutex::new(HostInventory::default())),
    )
}

async fn config_watcher() -> ConfigWatcher {
    let client = FakeMetadataClient::new();
    client.push(ConfigSnapshot {
        task_notification_enabled: false,
        os_inventory_enabled: false,
        svc_poll_interval_secs: 600,
        ..Default::default()
    });
    ConfigWatcher::start(client, CancellationToken::new()).await.unwrap()
}

#[tokio::test]
async fn cancelling_the_root_token_drains_and_returns_exit_code_zero() {
    let rpc: Arc<dyn RPCClient> = Arc::new(FakeRPCClient::new());
    let tasker = Tasker::spawn();
    let cancel = CancellationToken::new();
    let cleanup = DeferredCleanup::new();
    let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let ran_clone = Arc::clone(&ran);
    cleanup.push(move || ran_clone.store(true, std::sync::atomic::Ordering::SeqCst));

    let args = ServiceLoopArgs {
        clock: SystemClock,
        rpc,
        config_watcher: config_watcher().await,
        executor: executor(),
        tasker,
        inventory: Arc::new(Mutex::new(HostInventory::default())),
        restart_marker_path: std::path::PathBuf::from("/nonexistent/marker"),
        cleanup,
        cancel: cancel.clone(),
    };

    let run = tokio::spawn(ServiceLoop::run(args));

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let exit_code = tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("service loop never returned")
        .expect("service loop task panicked");

    assert_eq!(exit_code, 0);
    assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn restart_marker_presence_yields_exit_code_two() {
    // Shrinks the restart-marker poll interval so the real ticker fires
    // within the test timeout instead of waiting out its 10-minute default.
    std::env::set_var("FLEET_RESTART_MARKER_POLL_MS", "20");

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("restart-required");
    std::fs::write(&marker, b"").unwrap();

    let rpc: Arc<dyn RPCClient> = Arc::new(FakeRPCClient::new());
    let tasker = Tasker::spawn();
    let cancel = CancellationToken::new();

    let args = ServiceLoopArgs {
        clock: SystemClock,
        rpc,
        config_watcher: config_watcher().await,
        executor: executor(),
        tasker,
        inventory: Arc::new(Mutex::new(HostInventory::default())),
        restart_marker_path: marker,
        cleanup: DeferredCleanup::new(),
        cancel,
    };

    let exit_code = tokio::time::timeout(Duration::from_secs(2), ServiceLoop::run(args))
        .await
        .expect("service loop never noticed the restart marker");

    std::env::remove_var("FLEET_RESTART_MARKER_POLL_MS");

    assert_eq!(exit_code, 2);
}
