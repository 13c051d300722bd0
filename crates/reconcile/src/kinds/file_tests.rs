// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use fleet_adapters::{FakeRepoWriter, NoopAccountManager};
use fleet_core::Resource;
use serde_json::json;

use super::*;
use crate::caps::HostCaps;

fn caps() -> HostCaps {
    HostCaps {
        package_manager: Arc::new(fleet_adapters::FakePackageManager::default()),
        repo_writer: Arc::new(FakeRepoWriter::default()),
        script_runner: Arc::new(fleet_adapters::FakeScriptRunner::default()),
        account_manager: Arc::new(NoopAccountManager),
        http_client: reqwest::Client::new(),
        max_fetch_bytes: 1024 * 1024,
    }
}

#[tokio::test]
async fn writes_inline_content() {
    let caps = caps();
    let resource = Resource {
        id: "r1".to_string(),
        kind: "File".to_string(),
        spec: json!({ "path": "/etc/osconfig/test.conf", "content": "hello\n" }),
    };
    let managed = FileKind.validate(&resource, &caps).await.unwrap();
    assert!(!managed.check().await.unwrap());
    managed.enforce().await.unwrap();
    assert!(managed.check().await.unwrap());

    let bytes = caps
        .repo_writer
        .read(std::path::Path::new("/etc/osconfig/test.conf"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bytes, b"hello\n");
}

#[tokio::test]
async fn absent_state_removes_existing_file() {
    let caps = caps();
    caps
        .repo_writer
        .write_atomic(std::path::Path::new("/etc/osconfig/test.conf"), b"stale")
        .await
        .unwrap();

    let resource = Resource {
        id: "r1".to_string(),
        kind: "File".to_string(),
        spec: json!({ "path": "/etc/osconfig/test.conf", "state": "ABSENT" }),
    };
    let managed = FileKind.validate(&resource, &caps).await.unwrap();
    assert!(!managed.check().await.unwrap());
    managed.enforce().await.unwrap();
    assert!(managed.check().await.unwrap());
    assert!(caps
        .repo_writer
        .read(std::path::Path::new("/etc/osconfig/test.conf"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn present_without_content_or_url_fails_validate() {
    let caps = caps();
    let resource = Resource {
        id: "r1".to_string(),
        kind: "File".to_string(),
        spec: json!({ "path": "/etc/osconfig/test.conf" }),
    };
    assert!(FileKind.validate(&resource, &caps).await.is_err());
}

#[tokio::test]
async fn overwriting_with_new_content_is_not_a_collision() {
    let caps = caps();
    caps
        .repo_writer
        .write_atomic(std::path::Path::new("/etc/osconfig/test.conf"), b"old")
        .await
        .unwrap();
    let resource = Resource {
        id: "r1".to_string(),
        kind: "File".to_string(),
        spec: json!({ "path": "/etc/osconfig/test.conf", "content": "new" }),
    };
    let managed = FileKind.validate(&resource, &caps).await.unwrap();
    managed.enforce().await.unwrap();
    assert!(managed.check().await.unwrap());
}
