// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleetd`: the host agent binary (§6).
//!
//! Argument 0 selects the mode: the bare service loop (`""`/`run`/
//! `noservice`), a one-shot inventory upload (`inventory`/`osinventory`),
//! the legacy guest-policies path (`gp`/`policies`/`guestpolicies`/
//! `ospackage`), a one-shot task-notification wait (`w`/
//! `waitfortasknotification`/`ospatch`), or `wuaupdates <arg>` (Windows
//! update enumeration, emits JSON to stdout and exits).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use fleet_adapters::{
    AptPackageManager, FsRepoWriter, HttpMetadataClient, NoopAccountManager, RPCClient,
    SingletonLock, SubprocessScriptRunner, TcpRpcClient, TracedMetadataClient,
    TracedPackageManager, TracedRepoWriter, TracedRpcClient, TracedScriptRunner,
};
use fleet_core::{jitter, Clock, HostInventory, SystemClock, Tasker};
use fleet_reconcile::{HostCaps, ResourceRegistry};

use fleet_agentd::{
    Config, ConfigWatcher, DeferredCleanup, ServiceLoop, ServiceLoopArgs, ShutdownState,
    TaskExecutor,
};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");
const MAX_FETCH_BYTES: u64 = 1024 * 1024;

#[derive(Parser)]
#[command(name = "fleetd", version = AGENT_VERSION)]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,

    /// Enable a local profiling listener at 127.0.0.1:6060 (§6).
    #[arg(long)]
    profile: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Run the steady-state service loop (default when no mode is given).
    #[command(visible_aliases = ["run", "noservice"])]
    Service,
    /// Collect and upload inventory once, then exit.
    #[command(name = "inventory", visible_aliases = ["osinventory"])]
    Inventory,
    /// Legacy guest-policies path (out of scope, §1): logs and exits.
    #[command(name = "gp", visible_aliases = ["policies", "guestpolicies", "ospackage"])]
    GuestPolicies,
    /// Open the task-notification stream, process tasks until idle, exit.
    #[command(name = "w", visible_aliases = ["waitfortasknotification", "ospatch"])]
    WaitForTaskNotification,
    /// Emit JSON of available Windows updates to stdout and exit.
    WuaUpdates { arg: String },
}

#[tokio::main]
async fn main() {
    // §6: an unknown mode is a startup-fatal error (exit 1), distinct from
    // the restart-required exit code (2) the restart-marker watcher uses.
    // clap's own `Error::exit()` would reach for 2 on a bad argument, which
    // collides with that meaning, so parse failures are mapped to 1 here
    // instead (help/version requests still exit 0).
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            e.print().ok();
            std::process::exit(code);
        }
    };

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("fleetd: failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    rotate_log_if_needed(&config.log_path);
    if let Err(e) = write_startup_marker(&config) {
        eprintln!("fleetd: failed to write startup marker: {e}");
    }

    let _log_guard = match setup_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("fleetd: failed to set up logging: {e}");
            std::process::exit(1);
        }
    };

    if cli.profile {
        spawn_profiling_listener();
    }

    let exit_code = match cli.mode.unwrap_or(Mode::Service) {
        Mode::Service => run_service(&config).await,
        Mode::Inventory => run_inventory_once(&config).await,
        Mode::GuestPolicies => run_guest_policies_legacy(),
        Mode::WaitForTaskNotification => run_wait_for_task_notification(&config).await,
        Mode::WuaUpdates { arg } => run_wua_updates(&arg),
    };

    std::process::exit(exit_code);
}

async fn run_service(config: &Config) -> i32 {
    let cleanup = DeferredCleanup::new();

    let lock = match SingletonLock::acquire(config.lock_path.clone()) {
        Ok(lock) => lock,
        Err(e) => {
            tracing::error!(error = %e, "fleetd: another agent process is already running");
            write_startup_error(config, &e.to_string());
            return 1;
        }
    };
    // The lock itself releases on Drop; registering it here too keeps the
    // release on the same deferred-cleanup stack as everything else (§9).
    cleanup.push(move || drop(lock));

    let cancel = CancellationToken::new();

    let metadata_client = Arc::new(TracedMetadataClient::new(HttpMetadataClient::new(
        config.metadata_base_url.clone(),
    )));

    // §4.7: block on the first config snapshot before admitting any other
    // periodic work.
    let config_watcher = match ConfigWatcher::start(metadata_client, cancel.clone()).await {
        Ok(w) => w,
        Err(e) => {
            tracing::error!(error = %e, "fleetd: initial config snapshot fetch failed, fatal");
            write_startup_error(config, &e.to_string());
            cleanup.run_all();
            return 1;
        }
    };

    let rpc: Arc<dyn RPCClient> = Arc::new(TracedRpcClient::new(TcpRpcClient::new(
        config.rpc_addr.clone(),
        AGENT_VERSION,
    )));

    let snapshot = config_watcher.current();
    if !register_forever(rpc.as_ref(), &snapshot.project_id, &snapshot.instance_name, &cancel).await {
        tracing::info!("fleetd: shutting down before registration succeeded");
        cleanup.run_all();
        return ShutdownState::new().exit_code();
    }
    write_registration_cache(config, &snapshot.project_id, &snapshot.instance_name);

    let caps = Arc::new(HostCaps {
        package_manager: Arc::new(TracedPackageManager::new(AptPackageManager::new())),
        repo_writer: Arc::new(TracedRepoWriter::new(FsRepoWriter)),
        script_runner: Arc::new(TracedScriptRunner::new(SubprocessScriptRunner)),
        account_manager: Arc::new(NoopAccountManager),
        http_client: reqwest::Client::new(),
        max_fetch_bytes: MAX_FETCH_BYTES,
    });
    let registry = Arc::new(ResourceRegistry::with_builtin_kinds());
    let inventory = Arc::new(Mutex::new(detect_host_inventory()));
    let tasker = Tasker::spawn();
    let executor = TaskExecutor::new(tasker.clone(), registry, caps, Arc::clone(&inventory));

    ServiceLoop::run(ServiceLoopArgs {
        clock: SystemClock,
        rpc,
        config_watcher,
        executor,
        tasker,
        inventory,
        restart_marker_path: config.restart_marker_path.clone(),
        cleanup,
        cancel,
    })
    .await
}

/// §4.3: `RegisterAgent` retries internally up to a ~10-minute budget; on
/// total failure the caller sleeps 5 minutes and retries forever. Returns
/// `false` only if `cancel` fires first.
async fn register_forever(
    rpc: &dyn RPCClient,
    project_id: &str,
    instance_name: &str,
    cancel: &CancellationToken,
) -> bool {
    let budget = fleet_agentd::env::register_retry_budget();
    let forever_retry = fleet_agentd::env::register_forever_retry_interval();

    loop {
        let deadline = tokio::time::Instant::now() + budget;
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            match rpc.register(project_id, instance_name).await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "fleetd: registration attempt failed");
                    if tokio::time::Instant::now() >= deadline {
                        break;
                    }
                    let delay = jitter::backoff(Duration::from_millis(500), Duration::from_secs(30), attempt);
                    attempt = attempt.saturating_add(1);
                    tokio::select! {
                        _ = cancel.cancelled() => return false,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::warn!("fleetd: registration budget exhausted, retrying in 5 minutes");
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(forever_retry) => {}
        }
    }
}

async fn run_inventory_once(config: &Config) -> i32 {
    let metadata_client = Arc::new(HttpMetadataClient::new(config.metadata_base_url.clone()));
    let config_watcher = match ConfigWatcher::start(metadata_client, CancellationToken::new()).await {
        Ok(w) => w,
        Err(e) => {
            tracing::error!(error = %e, "fleetd: inventory mode: config fetch failed");
            return 1;
        }
    };
    let snapshot = config_watcher.current();

    let rpc = TracedRpcClient::new(TcpRpcClient::new(config.rpc_addr.clone(), AGENT_VERSION));
    let host = detect_host_inventory();
    let report = fleet_core::InventoryReport { host, collected_at_unix_ms: 0, ..Default::default() };

    if let Err(e) = rpc.register(&snapshot.project_id, &snapshot.instance_name).await {
        tracing::warn!(error = %e, "fleetd: inventory mode: registration failed, reporting anyway");
    }
    match rpc.report_inventory(&report).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "fleetd: inventory mode: report failed");
            1
        }
    }
}

/// Legacy guest-policies code path (§1 "Out of scope"). Logs and exits
/// cleanly rather than performing any work.
fn run_guest_policies_legacy() -> i32 {
    tracing::warn!("fleetd: guest-policies legacy mode is not implemented; exiting");
    0
}

/// Opens the task-notification stream, processes tasks until the process
/// is interrupted, then exits. A one-shot debugging aid distinct from the
/// service loop's persistent reconnect behavior.
async fn run_wait_for_task_notification(config: &Config) -> i32 {
    let metadata_client = Arc::new(HttpMetadataClient::new(config.metadata_base_url.clone()));
    let cancel = CancellationToken::new();
    let config_watcher = match ConfigWatcher::start(metadata_client, cancel.clone()).await {
        Ok(w) => w,
        Err(e) => {
            tracing::error!(error = %e, "fleetd: wait-for-task-notification: config fetch failed");
            return 1;
        }
    };

    let rpc: Arc<dyn RPCClient> = Arc::new(TracedRpcClient::new(TcpRpcClient::new(
        config.rpc_addr.clone(),
        AGENT_VERSION,
    )));
    let caps = Arc::new(HostCaps {
        package_manager: Arc::new(TracedPackageManager::new(AptPackageManager::new())),
        repo_writer: Arc::new(TracedRepoWriter::new(FsRepoWriter)),
        script_runner: Arc::new(TracedScriptRunner::new(SubprocessScriptRunner)),
        account_manager: Arc::new(NoopAccountManager),
        http_client: reqwest::Client::new(),
        max_fetch_bytes: MAX_FETCH_BYTES,
    });
    let registry = Arc::new(ResourceRegistry::with_builtin_kinds());
    let inventory = Arc::new(Mutex::new(detect_host_inventory()));
    let tasker = Tasker::spawn();
    let executor = TaskExecutor::new(tasker.clone(), registry, caps, inventory);

    let task_loop = fleet_agentd::TaskLoop::new(rpc, executor, config_watcher.subscribe(), cancel.clone());
    let handle = task_loop.spawn();

    let _ = tokio::signal::ctrl_c().await;
    cancel.cancel();
    let _ = handle.await;
    tasker.close().await;
    0
}

/// Windows update enumeration is a platform-specific external collaborator
/// (§1 "package-manager back-ends ... wua"); on any other platform this
/// emits an empty result rather than failing outright.
fn run_wua_updates(_arg: &str) -> i32 {
    println!("[]");
    0
}

/// Cache the last-successful registration identity so a future crash
/// restart has a record of it on disk (§3 `AgentState`). Best-effort: a
/// write failure is logged, not fatal.
fn write_registration_cache(config: &Config, project_id: &str, instance_name: &str) {
    let cache = serde_json::json!({ "project_id": project_id, "instance_name": instance_name });
    if let Err(e) = std::fs::write(&config.registration_cache_path, cache.to_string()) {
        tracing::warn!(error = %e, "fleetd: failed to write registration cache");
    }
}

fn detect_host_inventory() -> HostInventory {
    // §1: OS-version detection is an external collaborator; this is a
    // minimal stand-in using compile-time platform constants.
    HostInventory {
        os_short_name: std::env::consts::OS.to_string(),
        os_version: "unknown".to_string(),
        architecture: std::env::consts::ARCH.to_string(),
    }
}

/// Minimal local profiling listener (§6 `--profile`). Accepts connections
/// and closes them; a real pprof-style endpoint is out of scope here.
fn spawn_profiling_listener() {
    tokio::spawn(async move {
        let addr = fleet_agentd::env::profile_listen_addr();
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(addr, "fleetd: profiling listener bound");
                loop {
                    if listener.accept().await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "fleetd: profiling listener failed to bind"),
        }
    });
}

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the agent log file if it exceeds [`MAX_LOG_SIZE`]. Best-effort:
/// rotation failures are silently ignored so the agent still starts.
fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

const STARTUP_MARKER_PREFIX: &str = "--- fleetd: starting (pid: ";

fn write_startup_marker(config: &Config) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())
}

fn write_startup_error(config: &Config, error: &str) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path) else {
        return;
    };
    let _ = writeln!(file, "ERROR fleetd failed to start: {error}");
}

fn setup_logging(config: &Config) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let dir = config.log_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = config.log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("agent.log"));
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
