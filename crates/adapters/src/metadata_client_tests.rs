// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_client_returns_pushed_snapshots_in_order() {
    let client = FakeMetadataClient::new();
    let mut first = ConfigSnapshot::default();
    first.project_id = "proj-a".to_string();
    let mut second = ConfigSnapshot::default();
    second.project_id = "proj-b".to_string();
    client.push(first);
    client.push(second);

    let (got_first, _) = client.wait_for_change(None).await.unwrap();
    assert_eq!(got_first.project_id, "proj-a");
    let (got_second, _) = client.wait_for_change(None).await.unwrap();
    assert_eq!(got_second.project_id, "proj-b");
}

#[tokio::test(start_paused = true)]
async fn retry_recovers_after_transient_failures() {
    let client = FakeMetadataClient::new();
    client.fail_next_n(2);
    client.push(ConfigSnapshot::default());

    let result = wait_for_change_with_retry(client.as_ref(), None, 5).await;
    assert!(result.is_ok());
    assert_eq!(client.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_gives_up_after_max_attempts() {
    let client = FakeMetadataClient::new();
    client.fail_next_n(10);

    let result = wait_for_change_with_retry(client.as_ref(), None, 3).await;
    assert!(result.is_err());
    assert_eq!(client.call_count(), 3);
}
