// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `TaskExecutor` (§4.4): dispatches a `TaskStart` to the handler for its
//! type, submits the work to the [`fleet_core::Tasker`] with `label =
//! task_id`, streams periodic progress while it runs, and replies with
//! exactly one `TaskComplete`.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use fleet_core::{
    ComplianceReport, HostInventory, InventoryReport, PolicyAssignment, Tasker, TaskComplete,
    TaskNotification, TaskProgress, TaskStatus, TaskType,
};
use fleet_reconcile::{apply_policy, GroupOutcome, HostCaps, ResourceRegistry};

/// Bounded LRU of recently completed task ids (§4.4 "LRU sizing (ADDED)"):
/// lets a duplicate `TaskStart` after a stream reconnect (S5) be answered
/// from cache instead of re-executed.
const COMPLETED_LRU_CAPACITY: usize = 64;

/// How often a running task emits a `TaskProgress` heartbeat while work is
/// in flight.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// One outbound reply destined for the currently-open stream. The task
/// loop owns the actual stream writer and drains this channel; decoupling
/// the two means a task that outlives a stream drop keeps running and its
/// final `TaskComplete` is simply recorded into the LRU cache once there is
/// no live stream to flush it to (§4.4 "the work still runs to completion").
#[derive(Debug, Clone)]
pub enum ExecutorReply {
    Progress(TaskProgress),
    Complete(TaskComplete),
}

struct Shared {
    completed: Mutex<IndexMap<String, TaskComplete>>,
}

impl Shared {
    fn remember(&self, complete: TaskComplete) {
        let mut completed = self.completed.lock();
        if completed.len() >= COMPLETED_LRU_CAPACITY && !completed.contains_key(&complete.task_id) {
            completed.shift_remove_index(0);
        }
        completed.insert(complete.task_id.clone(), complete);
    }

    fn lookup(&self, task_id: &str) -> Option<TaskComplete> {
        let mut completed = self.completed.lock();
        // Touch: move to the back so it is least likely to be evicted next.
        if let Some(value) = completed.shift_remove(task_id) {
            completed.insert(task_id.to_string(), value.clone());
            Some(value)
        } else {
            None
        }
    }
}

/// Executes server-issued task types by submitting them to the shared
/// [`Tasker`]. One instance is shared by every connected stream across
/// reconnects, so the completed-task LRU survives a reconnection (§4.4).
#[derive(Clone)]
pub struct TaskExecutor {
    tasker: Tasker,
    registry: Arc<ResourceRegistry>,
    caps: Arc<HostCaps>,
    inventory: Arc<Mutex<HostInventory>>,
    shared: Arc<Shared>,
}

impl TaskExecutor {
    pub fn new(
        tasker: Tasker,
        registry: Arc<ResourceRegistry>,
        caps: Arc<HostCaps>,
        inventory: Arc<Mutex<HostInventory>>,
    ) -> Self {
        Self {
            tasker,
            registry,
            caps,
            inventory,
            shared: Arc::new(Shared { completed: Mutex::new(IndexMap::new()) }),
        }
    }

    /// Handle one `TaskStart`, submitting a reply sender the caller drains
    /// to forward onto the live stream (or drop, if the stream has since
    /// closed — the task still runs to completion per §4.4).
    pub fn dispatch(&self, notification: TaskNotification, replies: mpsc::UnboundedSender<ExecutorReply>) {
        if let Some(cached) = self.shared.lookup(&notification.task_id) {
            tracing::debug!(task_id = %notification.task_id, "task executor: duplicate TaskStart, replaying cached TaskComplete");
            let _ = replies.send(ExecutorReply::Complete(cached));
            return;
        }

        let task_id = notification.task_id.clone();
        let task_type = notification.task_type;

        let registry = Arc::clone(&self.registry);
        let caps = Arc::clone(&self.caps);
        let inventory = Arc::clone(&self.inventory);
        let shared = Arc::clone(&self.shared);
        let payload = notification.payload.clone();

        let enqueue_result = self.tasker.enqueue(task_id.clone(), move |cancel| {
            let replies = replies.clone();
            async move {
                let heartbeat = spawn_heartbeat(task_id.clone(), replies.clone());

                let complete = run_task(task_id.clone(), task_type, payload, &registry, &caps, &inventory, &cancel).await;

                heartbeat.abort();
                shared.remember(complete.clone());
                let _ = replies.send(ExecutorReply::Complete(complete));
            }
        });

        if enqueue_result.is_err() {
            tracing::warn!(task_id = %notification.task_id, "task executor: tasker closed, task rejected");
        }
    }
}

fn spawn_heartbeat(task_id: String, replies: mpsc::UnboundedSender<ExecutorReply>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
        interval.tick().await; // first tick fires immediately; skip it
        loop {
            interval.tick().await;
            let progress = TaskProgress {
                task_id: task_id.clone(),
                percent_complete: 0,
                status_message: "running".to_string(),
            };
            if replies.send(ExecutorReply::Progress(progress)).is_err() {
                return;
            }
        }
    })
}

async fn run_task(
    task_id: String,
    task_type: TaskType,
    payload: serde_json::Value,
    registry: &ResourceRegistry,
    caps: &HostCaps,
    inventory: &Mutex<HostInventory>,
    _cancel: &tokio_util::sync::CancellationToken,
) -> TaskComplete {
    match task_type {
        TaskType::ApplyPolicies => run_apply_policies(task_id, payload, registry, caps, inventory).await,
        TaskType::ReportInventory => run_report_inventory(task_id, inventory),
        TaskType::ExecStep => run_exec_step(task_id, payload, caps).await,
        // The legacy guest-policies / patch-management code path is an
        // out-of-scope external collaborator (§1); PatchRun is dispatched
        // but has no local handler to run it to completion.
        TaskType::PatchRun => TaskComplete {
            task_id,
            status: TaskStatus::Skipped,
            outputs: serde_json::json!({ "reason": "patch management is out of scope" }),
            resource_compliances: vec![],
        },
        // §4.4: an unrecognized type tag reports SKIPPED rather than
        // failing outright; the server remains free to retry with a task
        // type this agent version does understand.
        TaskType::Unknown => TaskComplete {
            task_id,
            status: TaskStatus::Skipped,
            outputs: serde_json::json!({ "reason": "unknown type" }),
            resource_compliances: vec![],
        },
    }
}

async fn run_exec_step(task_id: String, payload: serde_json::Value, caps: &HostCaps) -> TaskComplete {
    #[derive(serde::Deserialize)]
    struct ExecStepPayload {
        command: String,
        #[serde(default)]
        timeout_secs: Option<u64>,
    }

    let payload: ExecStepPayload = match serde_json::from_value(payload) {
        Ok(p) => p,
        Err(e) => {
            return TaskComplete {
                task_id,
                status: TaskStatus::Failed,
                outputs: serde_json::json!({ "error": e.to_string() }),
                resource_compliances: vec![],
            }
        }
    };

    let timeout = payload.timeout_secs.map(Duration::from_secs).unwrap_or(fleet_adapters::DEFAULT_EXEC_TIMEOUT);
    match caps.script_runner.run(&payload.command, timeout).await {
        Ok(result) => {
            let status = if result.exit_code == 0 { TaskStatus::Succeeded } else { TaskStatus::Failed };
            TaskComplete {
                task_id,
                status,
                outputs: serde_json::to_value(result).unwrap_or(serde_json::Value::Null),
                resource_compliances: vec![],
            }
        }
        Err(e) => TaskComplete {
            task_id,
            status: TaskStatus::Failed,
            outputs: serde_json::json!({ "error": e.to_string() }),
            resource_compliances: vec![],
        },
    }
}

async fn run_apply_policies(
    task_id: String,
    payload: serde_json::Value,
    registry: &ResourceRegistry,
    caps: &HostCaps,
    inventory: &Mutex<HostInventory>,
) -> TaskComplete {
    #[derive(serde::Deserialize)]
    struct ApplyPoliciesPayload {
        assignments: Vec<PolicyAssignment>,
    }

    let payload: ApplyPoliciesPayload = match serde_json::from_value(payload) {
        Ok(p) => p,
        Err(e) => {
            return TaskComplete {
                task_id,
                status: TaskStatus::Failed,
                outputs: serde_json::json!({ "error": e.to_string() }),
                resource_compliances: vec![],
            }
        }
    };

    let snapshot = inventory.lock().clone();
    let mut all_reports: Vec<ComplianceReport> = Vec::new();
    let mut any_error = false;
    let mut any_non_compliant = false;

    for assignment in &payload.assignments {
        match apply_policy(assignment, &snapshot, registry, caps).await {
            GroupOutcome::NoMatchingGroup => {
                tracing::info!(policy = %assignment.id, "apply policies: no matching group");
            }
            GroupOutcome::Applied(reports) => {
                any_error |= reports.iter().any(|r| r.state == fleet_core::ComplianceState::Error);
                any_non_compliant |= reports
                    .iter()
                    .any(|r| r.state == fleet_core::ComplianceState::NonCompliant);
                all_reports.extend(reports);
            }
        }
    }

    let status = if any_error {
        TaskStatus::PartialSuccess
    } else if any_non_compliant {
        TaskStatus::PartialSuccess
    } else {
        TaskStatus::Succeeded
    };

    TaskComplete {
        task_id,
        status,
        outputs: serde_json::Value::Null,
        resource_compliances: all_reports,
    }
}

fn run_report_inventory(task_id: String, inventory: &Mutex<HostInventory>) -> TaskComplete {
    let host = inventory.lock().clone();
    let report = InventoryReport { host, collected_at_unix_ms: 0, ..Default::default() };
    TaskComplete {
        task_id,
        status: TaskStatus::Succeeded,
        outputs: serde_json::to_value(report).unwrap_or(serde_json::Value::Null),
        resource_compliances: vec![],
    }
}

#[cfg(test)]
#[path = "task_executor_tests.rs"]
mod tests;
