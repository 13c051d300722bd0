// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

#[tokio::test]
async fn enqueued_jobs_run_in_order_one_at_a_time() {
    let tasker = Tasker::spawn();
    let order = Arc::new(Mutex::new(Vec::<u32>::new()));
    let concurrent = Arc::new(AtomicI64::new(0));
    let max_concurrent = Arc::new(AtomicI64::new(0));

    for i in 0..10 {
        let order = Arc::clone(&order);
        let concurrent = Arc::clone(&concurrent);
        let max_concurrent = Arc::clone(&max_concurrent);
        tasker
            .enqueue(format!("job-{i}"), move |_cancel| async move {
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                order.lock().push(i);
                concurrent.fetch_sub(1, Ordering::SeqCst);
            })
            .expect("enqueue");
    }

    tasker.close().await;

    assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    assert_eq!(*order.lock(), (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn close_drains_the_queue_and_waits_for_the_running_job() {
    let tasker = Tasker::spawn();
    let ran = Arc::new(AtomicBool::new(false));
    let ran2 = Arc::clone(&ran);

    tasker
        .enqueue("slow", move |_cancel| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ran2.store(true, Ordering::SeqCst);
        })
        .expect("enqueue");

    tasker.close().await;

    assert!(ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn enqueue_after_close_is_rejected() {
    let tasker = Tasker::spawn();
    tasker.close().await;

    let result = tasker.enqueue("late", |_cancel| async {});
    assert!(result.is_err());
}

#[tokio::test]
async fn close_is_idempotent() {
    let tasker = Tasker::spawn();
    tasker.close().await;
    tasker.close().await;
}

#[tokio::test]
async fn a_panicking_job_does_not_stop_the_worker() {
    let tasker = Tasker::spawn();
    let after_ran = Arc::new(AtomicBool::new(false));
    let after_ran2 = Arc::clone(&after_ran);

    tasker
        .enqueue("boom", |_cancel| async {
            panic!("deliberate failure inside a tasker job");
        })
        .expect("enqueue");
    tasker
        .enqueue("after", move |_cancel| async move {
            after_ran2.store(true, Ordering::SeqCst);
        })
        .expect("enqueue");

    tasker.close().await;

    assert!(after_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn depth_reflects_queued_and_running_jobs() {
    let tasker = Tasker::spawn();
    assert_eq!(tasker.depth(), 0);

    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let release_rx = Arc::new(Mutex::new(Some(release_rx)));

    tasker
        .enqueue("held", move |_cancel| {
            let release_rx = Arc::clone(&release_rx);
            async move {
                if let Some(rx) = release_rx.lock().take() {
                    let _ = rx.await;
                }
            }
        })
        .expect("enqueue");
    tasker.enqueue("queued", |_cancel| async {}).expect("enqueue");

    // Give the worker a moment to pick up the first job.
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(tasker.depth(), 2);

    let _ = release_tx.send(());
    tasker.close().await;
    assert_eq!(tasker.depth(), 0);
}

#[tokio::test]
async fn cancellation_token_is_shared_across_jobs() {
    let tasker = Tasker::spawn();
    let token = tasker.cancel_token();
    token.cancel();

    let saw_cancelled = Arc::new(AtomicBool::new(false));
    let saw_cancelled2 = Arc::clone(&saw_cancelled);
    tasker
        .enqueue("checks-cancel", move |cancel| async move {
            saw_cancelled2.store(cancel.is_cancelled(), Ordering::SeqCst);
        })
        .expect("enqueue");

    tasker.close().await;
    assert!(saw_cancelled.load(Ordering::SeqCst));
}
