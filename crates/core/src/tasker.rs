// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-worker queue that serializes all host-mutating work (§4.1).
//!
//! The host is a shared resource — package database locks, repository
//! files, services — so every mutation is funneled through exactly one
//! worker instead of taking per-resource locks. `Enqueue` never blocks the
//! caller; `Close` blocks until the queue has drained and the in-flight job
//! (if any) has returned.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type JobFn = Box<dyn FnOnce(CancellationToken) -> BoxFuture + Send>;

struct Job {
    label: String,
    run: JobFn,
}

#[derive(Debug, Error)]
#[error("tasker is closed")]
pub struct TaskerClosed;

/// The single-worker FIFO queue described in §4.1.
///
/// Cloning a `Tasker` shares the same worker and queue — it is a handle, not
/// an independent instance.
#[derive(Clone)]
pub struct Tasker {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<Job>>>>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
    closed: Arc<AtomicBool>,
    depth: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl Tasker {
    /// Start the worker and return a handle to it.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let depth = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let worker_depth = Arc::clone(&depth);
        let worker_cancel = cancel.clone();
        let worker = tokio::spawn(Self::run_worker(rx, worker_depth, worker_cancel));

        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
            worker: Arc::new(Mutex::new(Some(worker))),
            closed: Arc::new(AtomicBool::new(false)),
            depth,
            cancel,
        }
    }

    /// Queue depth, including any job currently running. Observability only
    /// (§4.1 "Observability (ADDED)") — never used for backpressure.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Cancellation token propagated to every queued job. Cancelling it
    /// signals in-flight work cooperatively; it does not kill the worker or
    /// forcibly abort a running job (§5 "Cancellation").
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Append a unit of work to the FIFO. Returns immediately; fails only if
    /// `close()` has already been called.
    pub fn enqueue<F, Fut>(&self, label: impl Into<String>, job: F) -> Result<(), TaskerClosed>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TaskerClosed);
        }
        let label = label.into();
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(TaskerClosed);
        };
        let queued = Job {
            label: label.clone(),
            run: Box::new(move |token| Box::pin(job(token))),
        };
        tx.send(queued).map_err(|_| TaskerClosed)?;
        self.depth.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(label = %label, depth = self.depth(), "tasker: enqueued");
        Ok(())
    }

    /// Block until the queue drains and the currently-running job (if any)
    /// returns; rejects further `enqueue` calls starting immediately.
    /// Idempotent: a second call is a cheap no-op.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);

        // Dropping the sender lets the worker's `rx.recv()` return `None`
        // once every already-queued job has been processed.
        let tx = self.tx.lock().take();
        drop(tx);

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "tasker: worker task ended abnormally during close");
            }
        }
    }

    async fn run_worker(
        mut rx: mpsc::UnboundedReceiver<Job>,
        depth: Arc<AtomicUsize>,
        cancel: CancellationToken,
    ) {
        while let Some(job) = rx.recv().await {
            let label = job.label;
            let fut = (job.run)(cancel.clone());
            // Run on a fresh task so a panic inside `fut` surfaces as a
            // `JoinError` instead of unwinding the worker loop itself.
            match tokio::spawn(fut).await {
                Ok(()) => tracing::debug!(label = %label, "tasker: job finished"),
                Err(e) if e.is_panic() => {
                    tracing::error!(label = %label, "tasker: job panicked, continuing")
                }
                Err(e) => tracing::warn!(label = %label, error = %e, "tasker: job did not complete"),
            }
            depth.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
#[path = "tasker_tests.rs"]
mod tests;
