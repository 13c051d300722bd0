// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire message shapes for the agent-endpoint RPC surface (§6): registration,
//! inventory upload, and the bidirectional task-notification stream.

use serde::{Deserialize, Serialize};

use fleet_core::{InventoryReport, TaskComplete, TaskNotification, TaskProgress};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub project_id: String,
    pub instance_name: String,
    pub agent_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportInventoryRequest {
    pub project_id: String,
    pub instance_name: String,
    pub report: InventoryReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportInventoryResponse {
    pub accepted: bool,
}

/// Client → server messages on the task-notification stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamClientMsg {
    Hello {
        project_id: String,
        instance_name: String,
    },
    Progress(TaskProgress),
    Complete(TaskComplete),
}

/// Server → client messages on the task-notification stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamServerMsg {
    TaskStart(TaskNotification),
}
