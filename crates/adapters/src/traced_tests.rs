// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::package_manager::FakePackageManager;
use crate::repo_writer::FakeRepoWriter;
use crate::script_runner::FakeScriptRunner;

#[tokio::test]
async fn traced_package_manager_delegates_to_inner() {
    let fake = FakePackageManager::new();
    let traced = TracedPackageManager::new(fake.clone());

    assert!(!traced.is_installed("foo").await.unwrap());
    traced.install("foo", false).await.unwrap();
    assert!(traced.is_installed("foo").await.unwrap());
}

#[tokio::test]
async fn traced_package_manager_self_heal_path_still_reaches_fake() {
    let fake = FakePackageManager::new();
    fake.fail_next_install("foo", "dpkg --configure -a");
    let traced = TracedPackageManager::new(fake.clone());

    assert!(traced.install("foo", false).await.is_err());
    traced.repair().await.unwrap();
    assert!(fake.was_repaired());
    traced.install("foo", false).await.unwrap();
}

#[tokio::test]
async fn traced_repo_writer_delegates_to_inner() {
    let fake = FakeRepoWriter::new();
    let traced = TracedRepoWriter::new(fake.clone());
    let path = std::path::Path::new("/etc/apt/sources.list.d/osconfig_added_x.list");

    traced.write_atomic(path, b"deb http://x stable main").await.unwrap();
    let read_back = traced.read(path).await.unwrap().unwrap();
    assert_eq!(read_back, b"deb http://x stable main");
}

#[tokio::test]
async fn traced_script_runner_delegates_to_inner() {
    let fake = FakeScriptRunner::new();
    fake.script(
        "echo hi",
        fleet_core::ExecRunResult {
            exit_code: 0,
            stdout_tail: "hi".to_string(),
            stderr_tail: String::new(),
            duration_ms: 1,
        },
    );
    let traced = TracedScriptRunner::new(fake);

    let result = traced.run("echo hi", Duration::from_secs(1)).await.unwrap();
    assert_eq!(result.stdout_tail, "hi");
}

#[tokio::test]
async fn traced_rpc_client_wraps_the_task_stream() {
    let fake = crate::rpc::FakeRPCClient::new();
    fake.push_task(fleet_core::TaskNotification {
        task_id: "t1".to_string(),
        task_type: fleet_core::TaskType::ReportInventory,
        payload: serde_json::Value::Null,
    });
    let traced = TracedRpcClient::new(fake.clone());

    let (mut reader, _writer) = traced.open_task_stream("proj", "inst").await.unwrap();
    let notification = reader.recv().await.unwrap().unwrap();
    assert_eq!(notification.task_id, "t1");
}
