// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared data model: policy assignments, resources, compliance reports, and
//! the task-notification wire types (§3 of the design).

use serde::{Deserialize, Serialize};

/// Whether an apply is a dry run or is allowed to mutate the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyMode {
    Validation,
    Enforcement,
}

/// A declarative desired-state unit with a kind tag and kind-specific spec.
///
/// `kind` is a dispatch key into the reconciler's `ResourceRegistry`, not a
/// closed Rust enum — §3 calls the kind set "Kind ∈ {Package, Repository,
/// File, Exec, ServiceAccount, (extensible)}"; an unknown tag fails validate
/// with `UNSUPPORTED_KIND` rather than failing to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique within the owning policy.
    pub id: String,
    pub kind: String,
    pub spec: serde_json::Value,
}

/// Inventory-filter predicate matched against the host's detected OS facts.
///
/// Every `Option` field left `None` matches any value; a group with an empty
/// filter always matches, so the first empty-filter group in a policy acts
/// as a catch-all default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryFilter {
    #[serde(default)]
    pub os_short_name: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
}

impl InventoryFilter {
    pub fn matches(&self, inventory: &HostInventory) -> bool {
        let os_ok = self
            .os_short_name
            .as_ref()
            .map_or(true, |want| want.eq_ignore_ascii_case(&inventory.os_short_name));
        let version_ok = self
            .os_version
            .as_ref()
            .map_or(true, |want| inventory.os_version.starts_with(want.as_str()));
        let arch_ok = self
            .architecture
            .as_ref()
            .map_or(true, |want| want.eq_ignore_ascii_case(&inventory.architecture));
        os_ok && version_ok && arch_ok
    }
}

/// An inventory-filtered bundle of resources. Groups are tried in
/// declaration order within a policy; at most one is active per apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroup {
    #[serde(default)]
    pub filter: InventoryFilter,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// One versioned policy, immutable for the lifetime of a single apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyAssignment {
    pub id: String,
    pub revision: u64,
    pub mode: PolicyMode,
    pub groups: Vec<ResourceGroup>,
}

/// Per-resource compliance state after a check or enforce pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceState {
    Compliant,
    NonCompliant,
    Unknown,
    Error,
}

/// Outcome recorded for a single resource within an apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub resource_id: String,
    pub state: ComplianceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default)]
    pub outputs: serde_json::Value,
}

impl ComplianceReport {
    pub fn compliant(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            state: ComplianceState::Compliant,
            cause: None,
            outputs: serde_json::Value::Null,
        }
    }

    pub fn error(resource_id: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            state: ComplianceState::Error,
            cause: Some(cause.into()),
            outputs: serde_json::Value::Null,
        }
    }
}

/// Server-initiated unit of work delivered over the task-notification stream.
///
/// `Unknown` catches any type tag this agent version doesn't recognize
/// (§4.4 "Unknown types report `TaskComplete{status=SKIPPED, reason="unknown
/// type"}`") — without it, a `TaskStart` carrying a tag from a newer server
/// would fail to deserialize at all, and the agent would treat the decode
/// failure as a stream error and reconnect forever against a server that
/// keeps re-sending the same notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    ApplyPolicies,
    PatchRun,
    ReportInventory,
    ExecStep,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNotification {
    pub task_id: String,
    pub task_type: TaskType,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Final status reported for a completed (or abandoned) task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Succeeded,
    PartialSuccess,
    Failed,
    Skipped,
    Unsupported,
}

/// Progress update sent while a task is running. `percent_complete` is
/// best-effort; resource-granularity callers may simply report 0 until done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub task_id: String,
    pub percent_complete: u8,
    pub status_message: String,
}

/// Terminal reply for a task id. Every failure path produces one of these —
/// nothing is silently dropped (§7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskComplete {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub outputs: serde_json::Value,
    #[serde(default)]
    pub resource_compliances: Vec<ComplianceReport>,
}

/// OS facts detected once at startup and refreshed on each inventory report;
/// both group selection (§4.5 step 1) and `ReportInventory` read this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostInventory {
    pub os_short_name: String,
    pub os_version: String,
    pub architecture: String,
}

/// Host-collected snapshot assembled by the `ReportInventory` task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryReport {
    pub host: HostInventory,
    #[serde(default)]
    pub installed_packages: Vec<String>,
    #[serde(default)]
    pub available_updates: Vec<String>,
    pub collected_at_unix_ms: u64,
}

/// Result of running a script through the `ScriptRunner` capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecRunResult {
    pub exit_code: i32,
    pub stdout_tail: String,
    pub stderr_tail: String,
    pub duration_ms: u64,
}

/// Immutable feature-flag snapshot published by the `ConfigWatcher` (§4.2).
///
/// Passed by value at each decision point rather than pulled from a global —
/// see the "Avoid global mutable config" design note (§9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub task_notification_enabled: bool,
    pub guest_policies_enabled: bool,
    pub os_inventory_enabled: bool,
    pub debug: bool,
    pub svc_poll_interval_secs: u64,
    pub project_id: String,
    pub instance_name: String,
    pub disable_local_logging: bool,
    pub disable_cloud_logging: bool,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            task_notification_enabled: true,
            guest_policies_enabled: false,
            os_inventory_enabled: true,
            debug: false,
            svc_poll_interval_secs: 600,
            project_id: String::new(),
            instance_name: String::new(),
            disable_local_logging: false,
            disable_cloud_logging: false,
        }
    }
}

/// Process-wide agent identity and feature-flag state (§3).
///
/// Mutated only by the `ConfigWatcher` (feature flags, via `update_config`)
/// and the `SingletonLock` owner (whether the lock is currently held); every
/// other reader takes an immutable clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub version: String,
    pub config: ConfigSnapshot,
    pub lock_acquired: bool,
}

impl AgentState {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            config: ConfigSnapshot::default(),
            lock_acquired: false,
        }
    }

    pub fn update_config(&mut self, config: ConfigSnapshot) {
        self.config = config;
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
