// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_core::{TaskType};

fn notification(id: &str) -> TaskNotification {
    TaskNotification {
        task_id: id.to_string(),
        task_type: TaskType::ReportInventory,
        payload: serde_json::Value::Null,
    }
}

#[tokio::test]
async fn register_fails_the_configured_number_of_times_then_succeeds() {
    let client = FakeRPCClient::new();
    client.fail_next_register_n(2);

    assert!(client.register("p", "i").await.is_err());
    assert!(client.register("p", "i").await.is_err());
    assert!(client.register("p", "i").await.is_ok());
    assert_eq!(client.register_call_count(), 3);
}

#[tokio::test]
async fn stream_delivers_pushed_tasks_in_order() {
    let client = FakeRPCClient::new();
    client.push_task(notification("t1"));
    client.push_task(notification("t2"));

    let (mut reader, _writer) = client.open_task_stream("p", "i").await.unwrap();
    let first = reader.recv().await.unwrap().unwrap();
    let second = reader.recv().await.unwrap().unwrap();
    assert_eq!(first.task_id, "t1");
    assert_eq!(second.task_id, "t2");
    assert!(reader.recv().await.unwrap().is_none());
}

#[tokio::test]
async fn drop_stream_once_fails_exactly_one_recv() {
    let client = FakeRPCClient::new();
    client.push_task(notification("t1"));
    client.drop_stream_once();

    let (mut reader, _writer) = client.open_task_stream("p", "i").await.unwrap();
    assert!(reader.recv().await.is_err());
    let recovered = reader.recv().await.unwrap().unwrap();
    assert_eq!(recovered.task_id, "t1");
}

#[tokio::test]
async fn sent_messages_are_recorded_in_order() {
    let client = FakeRPCClient::new();
    let (_reader, mut writer) = client.open_task_stream("p", "i").await.unwrap();

    writer
        .send_progress(TaskProgress {
            task_id: "t1".to_string(),
            percent_complete: 50,
            status_message: "halfway".to_string(),
        })
        .await
        .unwrap();
    writer
        .send_complete(TaskComplete {
            task_id: "t1".to_string(),
            status: fleet_core::TaskStatus::Succeeded,
            outputs: serde_json::Value::Null,
            resource_compliances: vec![],
        })
        .await
        .unwrap();

    let sent = client.sent();
    assert_eq!(sent.len(), 2);
    assert!(matches!(sent[0], RecordedSend::Progress(_)));
    assert!(matches!(sent[1], RecordedSend::Complete(_)));
}
