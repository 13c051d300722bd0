// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RPCClient` capability (§4.3): registration, inventory upload, and the
//! bidirectional task-notification stream. The state machine (`Idle →
//! Connecting → Streaming → (Draining|Reconnecting) → Closed`) and the
//! reconnect/backoff policy live in `fleet-agentd`'s task loop, not here —
//! this trait only models a single connection attempt and a single
//! already-open stream.

use async_trait::async_trait;
use thiserror::Error;

use fleet_core::{InventoryReport, TaskComplete, TaskNotification, TaskProgress};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("stream closed")]
    StreamClosed,
}

/// Registration, single-shot inventory upload, and stream open. One
/// connection attempt per call; retry/backoff policy lives in the caller
/// (§4.3: register retries internally up to a budget, inventory reports do
/// not retry locally, stream reconnects are driven by the task loop).
#[async_trait]
pub trait RPCClient: Send + Sync {
    async fn register(&self, project_id: &str, instance_name: &str) -> Result<(), RpcError>;

    async fn report_inventory(&self, report: &InventoryReport) -> Result<(), RpcError>;

    /// Opens one bidirectional task-notification stream and returns its
    /// read and write halves independently (§5: "its own mutex around the
    /// send side" — distinct from recv). Splitting at the source means the
    /// task loop never needs a shared lock across `.await` points to keep
    /// one side from starving the other.
    async fn open_task_stream(
        &self,
        project_id: &str,
        instance_name: &str,
    ) -> Result<(Box<dyn TaskStreamReader>, Box<dyn TaskStreamWriter>), RpcError>;
}

/// The receive half of an open task-notification stream (§4.3, §6).
///
/// `recv` returns `Ok(None)` when the server closes the stream cleanly
/// (distinct from a transport error, which is `Err`); the task loop treats
/// both as "reconnect".
#[async_trait]
pub trait TaskStreamReader: Send {
    async fn recv(&mut self) -> Result<Option<TaskNotification>, RpcError>;
}

/// The send half of an open task-notification stream (§4.3, §6). Owned
/// exclusively by the task loop's writer task, so no lock is needed to
/// protect it from the receive side.
#[async_trait]
pub trait TaskStreamWriter: Send {
    async fn send_progress(&mut self, progress: TaskProgress) -> Result<(), RpcError>;
    async fn send_complete(&mut self, complete: TaskComplete) -> Result<(), RpcError>;
}
