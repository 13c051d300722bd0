// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup and lifecycle errors (§7 "Config parse / metadata fatal:
//! terminates the process at startup only").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentdError {
    #[error("could not determine a state directory for this platform")]
    NoStateDir,

    #[error("failed to acquire singleton lock: another agent process is already running")]
    LockFailed(#[from] fleet_adapters::SingletonLockError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("initial config snapshot fetch failed permanently: {0}")]
    ConfigFatal(#[from] fleet_adapters::MetadataClientError),

    #[error("registration failed permanently: {0}")]
    RegisterFatal(fleet_adapters::RpcError),

    #[error("unrecognized invocation mode {0:?}")]
    UnknownMode(String),

    #[error("{0}")]
    Other(String),
}
