// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use fleet_adapters::NoopAccountManager;
use fleet_core::Resource;
use serde_json::json;

use super::*;
use crate::caps::HostCaps;

fn caps() -> HostCaps {
    HostCaps {
        package_manager: Arc::new(fleet_adapters::FakePackageManager::default()),
        repo_writer: Arc::new(fleet_adapters::FakeRepoWriter::default()),
        script_runner: Arc::new(fleet_adapters::FakeScriptRunner::default()),
        account_manager: Arc::new(NoopAccountManager),
        http_client: reqwest::Client::new(),
        max_fetch_bytes: 1024 * 1024,
    }
}

#[tokio::test]
async fn noop_backend_always_reports_compliant() {
    let caps = caps();
    let resource = Resource {
        id: "r1".to_string(),
        kind: "ServiceAccount".to_string(),
        spec: json!({ "name": "deploy" }),
    };
    let managed = ServiceAccountKind.validate(&resource, &caps).await.unwrap();
    assert!(managed.check().await.unwrap());
    managed.enforce().await.unwrap();
    assert!(managed.check().await.unwrap());
}

#[tokio::test]
async fn rejects_malformed_spec() {
    let caps = caps();
    let resource = Resource {
        id: "r1".to_string(),
        kind: "ServiceAccount".to_string(),
        spec: json!({}),
    };
    assert!(ServiceAccountKind.validate(&resource, &caps).await.is_err());
}
