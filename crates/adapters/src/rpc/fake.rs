// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `RPCClient`/task-stream reader and writer for the task loop,
//! task executor, and end-to-end scenario tests (S5/S6).

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use super::client::{RpcError, TaskStreamReader, TaskStreamWriter, RPCClient};
use fleet_core::{InventoryReport, TaskComplete, TaskNotification, TaskProgress};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedSend {
    Progress(TaskProgress),
    Complete(TaskComplete),
}

/// Shared state behind both the `FakeRPCClient` handle the test holds and
/// the reader/writer pairs handed out by `open_task_stream` — a new pair is
/// returned each call (mirroring reconnection), but they all share the same
/// pending-notification queue and recorded-sends log.
#[derive(Default)]
struct Shared {
    pending: VecDeque<TaskNotification>,
    sent: Vec<RecordedSend>,
    register_calls: u32,
    fail_next_register: u32,
    fail_next_stream_open: u32,
    inventory_reports: Vec<InventoryReport>,
    /// When `true`, `recv()` returns `Err` once (simulating a stream drop)
    /// before yielding further notifications.
    drop_stream_once: bool,
}

#[derive(Default, Clone)]
pub struct FakeRPCClient {
    shared: Arc<Mutex<Shared>>,
}

impl FakeRPCClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_task(&self, notification: TaskNotification) {
        self.shared.lock().pending.push_back(notification);
    }

    pub fn fail_next_register_n(&self, n: u32) {
        self.shared.lock().fail_next_register = n;
    }

    pub fn fail_next_stream_open(&self) {
        self.shared.lock().fail_next_stream_open += 1;
    }

    /// Simulate a mid-task stream drop (§4.3 / S5): the next `recv()` on any
    /// open stream fails once.
    pub fn drop_stream_once(&self) {
        self.shared.lock().drop_stream_once = true;
    }

    pub fn register_call_count(&self) -> u32 {
        self.shared.lock().register_calls
    }

    pub fn sent(&self) -> Vec<RecordedSend> {
        self.shared.lock().sent.clone()
    }

    pub fn inventory_reports(&self) -> Vec<InventoryReport> {
        self.shared.lock().inventory_reports.clone()
    }
}

#[async_trait]
impl RPCClient for FakeRPCClient {
    async fn register(&self, _project_id: &str, _instance_name: &str) -> Result<(), RpcError> {
        let mut shared = self.shared.lock();
        shared.register_calls += 1;
        if shared.fail_next_register > 0 {
            shared.fail_next_register -= 1;
            return Err(RpcError::Transport("simulated registration failure".to_string()));
        }
        Ok(())
    }

    async fn report_inventory(&self, report: &InventoryReport) -> Result<(), RpcError> {
        self.shared.lock().inventory_reports.push(report.clone());
        Ok(())
    }

    async fn open_task_stream(
        &self,
        _project_id: &str,
        _instance_name: &str,
    ) -> Result<(Box<dyn TaskStreamReader>, Box<dyn TaskStreamWriter>), RpcError> {
        let mut shared = self.shared.lock();
        if shared.fail_next_stream_open > 0 {
            shared.fail_next_stream_open -= 1;
            return Err(RpcError::Transport("simulated stream open failure".to_string()));
        }
        Ok((
            Box::new(FakeTaskStreamReader { shared: Arc::clone(&self.shared) }),
            Box::new(FakeTaskStreamWriter { shared: Arc::clone(&self.shared) }),
        ))
    }
}

struct FakeTaskStreamReader {
    shared: Arc<Mutex<Shared>>,
}

#[async_trait]
impl TaskStreamReader for FakeTaskStreamReader {
    async fn recv(&mut self) -> Result<Option<TaskNotification>, RpcError> {
        let mut shared = self.shared.lock();
        if shared.drop_stream_once {
            shared.drop_stream_once = false;
            return Err(RpcError::StreamClosed);
        }
        Ok(shared.pending.pop_front())
    }
}

struct FakeTaskStreamWriter {
    shared: Arc<Mutex<Shared>>,
}

#[async_trait]
impl TaskStreamWriter for FakeTaskStreamWriter {
    async fn send_progress(&mut self, progress: TaskProgress) -> Result<(), RpcError> {
        self.shared.lock().sent.push(RecordedSend::Progress(progress));
        Ok(())
    }

    async fn send_complete(&mut self, complete: TaskComplete) -> Result<(), RpcError> {
        self.shared.lock().sent.push(RecordedSend::Complete(complete));
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
