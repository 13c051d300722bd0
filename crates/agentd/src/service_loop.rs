// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ServiceLoop` (§4.7): starts `PeriodicSupervisor`, opens/closes the
//! task-notification stream via `TaskLoop` in response to config-change
//! events, relays SIGINT/SIGTERM into a single root `CancellationToken`,
//! and drains every subcomponent before returning an exit code.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use fleet_adapters::RPCClient;
use fleet_core::{Clock, ConfigSnapshot, HostInventory, Tasker};

use crate::config_watcher::ConfigWatcher;
use crate::lifecycle::{DeferredCleanup, ShutdownState};
use crate::periodic_supervisor::{PeriodicSupervisor, PeriodicSupervisorArgs};
use crate::task_executor::TaskExecutor;
use crate::task_loop::TaskLoop;

pub struct ServiceLoopArgs<C: Clock> {
    pub clock: C,
    pub rpc: Arc<dyn RPCClient>,
    pub config_watcher: ConfigWatcher,
    pub executor: TaskExecutor,
    pub tasker: Tasker,
    pub inventory: Arc<Mutex<HostInventory>>,
    pub restart_marker_path: PathBuf,
    pub cleanup: DeferredCleanup,
    /// Root cancellation token, shared with `ConfigWatcher` and anything
    /// else started before the service loop (§5 "Root context cancelled on
    /// SIGINT/SIGTERM"). The restart-marker watcher also cancels this same
    /// token, so every subcomponent observes one shutdown signal.
    pub cancel: CancellationToken,
}

/// Runs the agent's steady-state loop until a signal or the restart marker
/// requests shutdown, then drains in-flight work and returns the process
/// exit code (§6: 0 normal, 2 restart-required).
pub struct ServiceLoop;

impl ServiceLoop {
    pub async fn run<C: Clock>(args: ServiceLoopArgs<C>) -> i32 {
        let ServiceLoopArgs { clock, rpc, config_watcher, executor, tasker, inventory, restart_marker_path, cleanup, cancel } = args;

        let shutdown = ShutdownState::new();

        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("service loop: signal received, shutting down");
            signal_cancel.cancel();
        });

        let task_loop = TaskLoop::new(rpc.clone(), executor, config_watcher.subscribe(), cancel.clone());
        let task_loop_handle = task_loop.spawn();

        let supervisor_handles = PeriodicSupervisor::spawn(PeriodicSupervisorArgs {
            clock,
            rpc,
            inventory,
            config_rx: config_watcher.subscribe(),
            restart_marker_path,
            cancel: cancel.clone(),
            restart_requested: shutdown.flag(),
        });

        cancel.cancelled().await;

        // Drain: let the task loop's reconnect/stream logic notice
        // cancellation and return, then close the Tasker so any in-flight
        // host mutation finishes before we consider ourselves stopped.
        let _ = task_loop_handle.await;
        for handle in supervisor_handles {
            let _ = handle.await;
        }
        tasker.close().await;

        cleanup.run_all();

        shutdown.exit_code()
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "service loop: failed to install SIGTERM handler");
            std::future::pending::<()>().await;
            unreachable!()
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "service loop: failed to install SIGINT handler");
            std::future::pending::<()>().await;
            unreachable!()
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
#[path = "service_loop_tests.rs"]
mod tests;
