// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration: well-known per-platform paths for the lock file,
//! log file, restart marker, and registration cache, loaded once at
//! startup.

use std::path::PathBuf;

use crate::error::AgentdError;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. `~/.local/state/fleet-agent`).
    pub state_dir: PathBuf,
    /// Advisory singleton-lock file (§4.8).
    pub lock_path: PathBuf,
    /// Daemon log file; rotated by [`crate::main::rotate_log_if_needed`].
    pub log_path: PathBuf,
    /// Restart marker: its mere existence requests graceful shutdown (§4.6).
    pub restart_marker_path: PathBuf,
    /// Cached project id / instance name from the last successful
    /// registration, read back on startup so a crash-restart does not need
    /// to re-register before it can open the task stream.
    pub registration_cache_path: PathBuf,
    /// Base URL for the local instance-metadata server consulted by
    /// [`crate::config_watcher::ConfigWatcher`].
    pub metadata_base_url: String,
    /// Address of the agent-endpoint RPC service.
    pub rpc_addr: String,
}

impl Config {
    /// Load configuration for the host agent.
    ///
    /// Uses fixed paths under `~/.local/state/fleet-agent/` (or
    /// `$XDG_STATE_HOME/fleet-agent/`), one agent per host.
    pub fn load() -> Result<Self, AgentdError> {
        let state_dir = state_dir()?;

        Ok(Self {
            lock_path: state_dir.join("agent.lock"),
            log_path: state_dir.join("agent.log"),
            restart_marker_path: state_dir.join("restart-required"),
            registration_cache_path: state_dir.join("registration.json"),
            metadata_base_url: std::env::var("FLEET_METADATA_BASE_URL")
                .unwrap_or_else(|_| "http://metadata.internal".to_string()),
            rpc_addr: std::env::var("FLEET_RPC_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:7443".to_string()),
            state_dir,
        })
    }
}

fn state_dir() -> Result<PathBuf, AgentdError> {
    if let Ok(dir) = std::env::var("FLEET_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|d| d.join("fleet-agent"))
        .ok_or(AgentdError::NoStateDir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
