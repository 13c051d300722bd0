// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Exec` resource: runs a command via the `ScriptRunner` capability. There
//! is no host state to compare against for an arbitrary command, so
//! `check()` tracks only whether *this* `ManagedResource` has already run it
//! during the current apply — `enforce(); check()` is COMPLIANT within one
//! apply (§3 invariant 5), but a fresh apply always gets a fresh chance to
//! run, matching the `ExecStep` task type's "run every time it's requested"
//! semantics.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fleet_adapters::{ScriptRunner, DEFAULT_EXEC_TIMEOUT};
use fleet_core::{ExecRunResult, Resource};
use parking_lot::Mutex;

use crate::caps::HostCaps;
use crate::error::ReconcileError;
use crate::kinds::{ManagedResource, ResourceKind};

#[derive(Debug, Deserialize)]
struct ExecSpec {
    command: String,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

pub struct ExecKind;

#[async_trait]
impl ResourceKind for ExecKind {
    async fn validate(
        &self,
        resource: &Resource,
        caps: &HostCaps,
    ) -> Result<Box<dyn ManagedResource>, ReconcileError> {
        let spec: ExecSpec = serde_json::from_value(resource.spec.clone())
            .map_err(|e| ReconcileError::Validate(format!("invalid exec spec: {e}")))?;
        if spec.command.trim().is_empty() {
            return Err(ReconcileError::Validate("exec resource command is empty".to_string()));
        }
        Ok(Box::new(ExecManaged {
            command: spec.command,
            timeout: spec
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_EXEC_TIMEOUT),
            script_runner: Arc::clone(&caps.script_runner),
            ran: AtomicBool::new(false),
            last_result: Mutex::new(None),
        }))
    }

    fn priority(&self) -> u8 {
        3
    }
}

struct ExecManaged {
    command: String,
    timeout: Duration,
    script_runner: Arc<dyn ScriptRunner>,
    ran: AtomicBool,
    last_result: Mutex<Option<ExecRunResult>>,
}

#[async_trait]
impl ManagedResource for ExecManaged {
    async fn check(&self) -> Result<bool, ReconcileError> {
        Ok(self.ran.load(Ordering::SeqCst))
    }

    async fn enforce(&self) -> Result<(), ReconcileError> {
        let result = self
            .script_runner
            .run(&self.command, self.timeout)
            .await
            .map_err(|e| ReconcileError::Enforce(e.to_string()))?;
        let exit_code = result.exit_code;
        let stderr_tail = result.stderr_tail.clone();
        *self.last_result.lock() = Some(result);
        if exit_code == 0 {
            self.ran.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(ReconcileError::Enforce(format!(
                "command exited {exit_code}: {stderr_tail}"
            )))
        }
    }

    fn populate_output(&self) -> Value {
        match &*self.last_result.lock() {
            Some(result) => json!({
                "exit_code": result.exit_code,
                "stdout_tail": result.stdout_tail,
                "stderr_tail": result.stderr_tail,
                "duration_ms": result.duration_ms,
            }),
            None => Value::Null,
        }
    }

    async fn cleanup(&self) {}
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
