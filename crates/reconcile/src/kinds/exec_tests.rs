// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use fleet_adapters::{FakeScriptRunner, NoopAccountManager};
use fleet_core::{ExecRunResult, Resource};
use serde_json::json;

use super::*;
use crate::caps::HostCaps;

fn caps(runner: Arc<FakeScriptRunner>) -> HostCaps {
    HostCaps {
        package_manager: Arc::new(fleet_adapters::FakePackageManager::default()),
        repo_writer: Arc::new(fleet_adapters::FakeRepoWriter::default()),
        script_runner: runner,
        account_manager: Arc::new(NoopAccountManager),
        http_client: reqwest::Client::new(),
        max_fetch_bytes: 1024 * 1024,
    }
}

#[tokio::test]
async fn starts_non_compliant_and_becomes_compliant_after_enforce() {
    let runner = FakeScriptRunner::new();
    let caps = caps(runner);
    let resource = Resource {
        id: "r1".to_string(),
        kind: "Exec".to_string(),
        spec: json!({ "command": "echo hi" }),
    };
    let managed = ExecKind.validate(&resource, &caps).await.unwrap();
    assert!(!managed.check().await.unwrap());
    managed.enforce().await.unwrap();
    assert!(managed.check().await.unwrap());
}

#[tokio::test]
async fn nonzero_exit_is_reported_as_enforce_error() {
    let runner = FakeScriptRunner::new();
    runner.script(
        "false",
        ExecRunResult { exit_code: 1, stdout_tail: String::new(), stderr_tail: "boom".to_string(), duration_ms: 5 },
    );
    let caps = caps(runner);
    let resource = Resource {
        id: "r1".to_string(),
        kind: "Exec".to_string(),
        spec: json!({ "command": "false" }),
    };
    let managed = ExecKind.validate(&resource, &caps).await.unwrap();
    let err = managed.enforce().await.unwrap_err();
    assert!(err.to_string().contains("boom"));
    assert!(!managed.check().await.unwrap());
}

#[tokio::test]
async fn rejects_empty_command() {
    let runner = FakeScriptRunner::new();
    let caps = caps(runner);
    let resource = Resource {
        id: "r1".to_string(),
        kind: "Exec".to_string(),
        spec: json!({ "command": "   " }),
    };
    assert!(ExecKind.validate(&resource, &caps).await.is_err());
}
