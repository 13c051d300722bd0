// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use fleet_adapters::{FakeRepoWriter, NoopAccountManager};
use fleet_core::Resource;
use serde_json::json;

use super::*;
use crate::caps::HostCaps;

fn caps(writer: Arc<FakeRepoWriter>) -> HostCaps {
    HostCaps {
        package_manager: Arc::new(fleet_adapters::FakePackageManager::default()),
        repo_writer: writer,
        script_runner: Arc::new(fleet_adapters::FakeScriptRunner::default()),
        account_manager: Arc::new(NoopAccountManager),
        http_client: reqwest::Client::new(),
        max_fetch_bytes: 1024 * 1024,
    }
}

/// S1: apt repo add, no GPG key.
#[tokio::test]
async fn apt_repo_renders_and_enforces() {
    let writer = FakeRepoWriter::new();
    let caps = caps(writer.clone());
    let kind = RepositoryKind;
    let resource = Resource {
        id: "r1".to_string(),
        kind: "Repository".to_string(),
        spec: json!({
            "apt": {
                "uri": "http://example/deb",
                "dist": "stable",
                "components": ["main"],
            }
        }),
    };

    let managed = kind.validate(&resource, &caps).await.unwrap();
    assert!(!managed.check().await.unwrap());
    managed.enforce().await.unwrap();
    assert!(managed.check().await.unwrap());

    let output = managed.populate_output();
    let path = output["repo_path"].as_str().unwrap();
    assert!(path.starts_with("/etc/apt/sources.list.d/osconfig_added_"));
    assert!(path.ends_with(".list"));

    let contents = writer.contents(std::path::Path::new(path)).unwrap();
    assert_eq!(
        String::from_utf8(contents).unwrap(),
        "# Repo file managed by Google OSConfig agent\ndeb http://example/deb stable main\n"
    );

    // Second apply is a no-op: already compliant, enforce would not even be
    // called by the reconciler, but a direct re-enforce is still safe.
    managed.enforce().await.unwrap();
    assert!(managed.check().await.unwrap());
}

/// S2: yum repo with two gpg keys, no display_name.
#[tokio::test]
async fn yum_repo_with_two_keys_renders_expected_stanza() {
    let writer = FakeRepoWriter::new();
    let caps = caps(writer.clone());
    let kind = RepositoryKind;
    let resource = Resource {
        id: "r1".to_string(),
        kind: "Repository".to_string(),
        spec: json!({
            "yum": {
                "id": "X",
                "base_url": "U",
                "gpg_keys": ["A", "B"],
            }
        }),
    };

    let managed = kind.validate(&resource, &caps).await.unwrap();
    managed.enforce().await.unwrap();
    let output = managed.populate_output();
    let path = output["repo_path"].as_str().unwrap();
    let contents = writer.contents(std::path::Path::new(path)).unwrap();
    assert_eq!(
        String::from_utf8(contents).unwrap(),
        "# Repo file managed by Google OSConfig agent\n[X]\nname=X\nbaseurl=U\nenabled=1\ngpgcheck=1\ngpgkey=A\n       B\n"
    );
}

#[tokio::test]
async fn repo_path_depends_only_on_contents() {
    let writer1 = FakeRepoWriter::new();
    let writer2 = FakeRepoWriter::new();
    let spec = json!({
        "apt": { "uri": "http://example/deb", "dist": "stable", "components": ["main"] }
    });
    let resource = Resource { id: "r1".to_string(), kind: "Repository".to_string(), spec };

    let m1 = RepositoryKind.validate(&resource, &caps(writer1)).await.unwrap();
    let m2 = RepositoryKind.validate(&resource, &caps(writer2)).await.unwrap();
    assert_eq!(m1.populate_output(), m2.populate_output());
}

#[tokio::test]
async fn digest_collision_is_reported_as_error_not_overwritten() {
    let writer = FakeRepoWriter::new();
    let caps = caps(writer.clone());
    let resource = Resource {
        id: "r1".to_string(),
        kind: "Repository".to_string(),
        spec: json!({
            "apt": { "uri": "http://example/deb", "dist": "stable", "components": ["main"] }
        }),
    };
    let managed = RepositoryKind.validate(&resource, &caps).await.unwrap();
    let output = managed.populate_output();
    let path = output["repo_path"].as_str().unwrap();

    // Simulate a prior write under the same digest-derived path with
    // different bytes -- the only way this can happen is a true collision.
    writer
        .write_atomic(std::path::Path::new(path), b"unrelated contents")
        .await
        .unwrap();

    let err = managed.enforce().await.unwrap_err();
    assert!(matches!(err, ReconcileError::HashCollision { .. }));
    // The existing (wrong) file was never overwritten.
    assert_eq!(
        writer.contents(std::path::Path::new(path)).unwrap(),
        b"unrelated contents"
    );
}

#[tokio::test]
async fn rejects_malformed_spec() {
    let writer = FakeRepoWriter::new();
    let caps = caps(writer);
    let resource = Resource {
        id: "r1".to_string(),
        kind: "Repository".to_string(),
        spec: json!({ "unknown_family": {} }),
    };
    assert!(RepositoryKind.validate(&resource, &caps).await.is_err());
}
