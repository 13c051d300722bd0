// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `fleet-agentd`: the host agent's service loop, config watcher, task
//! executor, and periodic supervisor (§2, §4.2, §4.4, §4.6, §4.7). The
//! `fleetd` binary in `src/main.rs` wires these against the production
//! adapters in `fleet-adapters`.

pub mod config;
pub mod config_watcher;
pub mod env;
pub mod error;
pub mod lifecycle;
pub mod periodic_supervisor;
pub mod service_loop;
pub mod task_executor;
pub mod task_loop;

pub use config::Config;
pub use config_watcher::ConfigWatcher;
pub use error::AgentdError;
pub use lifecycle::{DeferredCleanup, ShutdownState};
pub use periodic_supervisor::{PeriodicSupervisor, PeriodicSupervisorArgs};
pub use service_loop::{ServiceLoop, ServiceLoopArgs};
pub use task_executor::{ExecutorReply, TaskExecutor};
pub use task_loop::TaskLoop;
