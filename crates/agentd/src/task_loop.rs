// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task-notification loop (§4.7, §9 "Task loop as a state machine, not a
//! call graph"): owns the `RPCClient` stream's lifecycle, reified as
//! explicit transitions `{Disabled, Connecting, Streaming}` driven by
//! config-change events, stream errors, and cancellation — rather than
//! interleaving "enabled?" checks with stream open/close across loop
//! iterations.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use fleet_adapters::{RPCClient, TaskStreamReader, TaskStreamWriter};
use fleet_core::ConfigSnapshot;

use crate::task_executor::{ExecutorReply, TaskExecutor};

const BACKOFF_BASE: Duration = Duration::from_millis(500);
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Runs the task-notification loop until `cancel` fires. One instance per
/// agent process; reconnects are handled internally and never visible to
/// the caller.
pub struct TaskLoop {
    rpc: Arc<dyn RPCClient>,
    executor: TaskExecutor,
    config_rx: watch::Receiver<ConfigSnapshot>,
    cancel: CancellationToken,
}

impl TaskLoop {
    pub fn new(
        rpc: Arc<dyn RPCClient>,
        executor: TaskExecutor,
        config_rx: watch::Receiver<ConfigSnapshot>,
        cancel: CancellationToken,
    ) -> Self {
        Self { rpc, executor, config_rx, cancel }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return;
            }

            let snapshot = self.config_rx.borrow().clone();
            if !snapshot.task_notification_enabled {
                // Disabled: wait for the flag to flip, a config change that
                // leaves it disabled is simply re-checked (§2 "ConfigWatcher
                // → ServiceLoop toggles RPCClient stream on/off").
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    changed = self.config_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
                continue;
            }

            let reason = match self.rpc.open_task_stream(&snapshot.project_id, &snapshot.instance_name).await {
                Ok((reader, writer)) => {
                    tracing::info!("task loop: stream open");
                    self.stream_until_disconnect(reader, writer).await
                }
                Err(e) => {
                    tracing::warn!(error = %e, "task loop: stream open failed");
                    Disconnect::StreamError
                }
            };

            match reason {
                Disconnect::Cancelled => return,
                Disconnect::ConfigDisabled => {
                    // Re-checked at the top of the loop; no backoff needed,
                    // this is an intentional transition, not a fault.
                    attempt = 0;
                }
                Disconnect::StreamError => {
                    let delay = fleet_core::jitter::backoff(BACKOFF_BASE, BACKOFF_CAP, attempt);
                    attempt = attempt.saturating_add(1);
                    tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, "task loop: backing off before reconnect");
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Runs one open stream until it errs, the server closes it cleanly, the
    /// config flips task-notification off, or `cancel` fires. Always
    /// returns to the outer loop, which decides whether and how to
    /// reconnect based on the returned [`Disconnect`] reason.
    ///
    /// Reader and writer are independent objects from the moment the
    /// stream is opened (§5: "its own mutex around the send side"), so the
    /// writer task never needs to wait on a lock the reader is holding
    /// across its `.await` — a `TaskComplete` that becomes ready while this
    /// loop is parked in `reader.recv()` is flushed immediately instead of
    /// waiting for the next `TaskStart`.
    async fn stream_until_disconnect(
        &mut self,
        mut reader: Box<dyn TaskStreamReader>,
        mut writer: Box<dyn TaskStreamWriter>,
    ) -> Disconnect {
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ExecutorReply>();

        let writer_cancel = self.cancel.clone();
        let writer_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = writer_cancel.cancelled() => return,
                    reply = reply_rx.recv() => {
                        let Some(reply) = reply else { return };
                        let result = match reply {
                            ExecutorReply::Progress(p) => writer.send_progress(p).await,
                            ExecutorReply::Complete(c) => writer.send_complete(c).await,
                        };
                        if let Err(e) = result {
                            tracing::warn!(error = %e, "task loop: send failed");
                        }
                    }
                }
            }
        });

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    writer_task.abort();
                    return Disconnect::Cancelled;
                }
                changed = self.config_rx.changed() => {
                    if changed.is_err() {
                        writer_task.abort();
                        return Disconnect::Cancelled;
                    }
                    if !self.config_rx.borrow().task_notification_enabled {
                        tracing::info!("task loop: task notification disabled, closing stream");
                        writer_task.abort();
                        return Disconnect::ConfigDisabled;
                    }
                }
                recv = reader.recv() => {
                    match recv {
                        Ok(Some(notification)) => {
                            self.executor.dispatch(notification, reply_tx.clone());
                        }
                        Ok(None) => {
                            tracing::info!("task loop: stream closed by server, reconnecting");
                            writer_task.abort();
                            return Disconnect::StreamError;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "task loop: stream recv failed, reconnecting");
                            writer_task.abort();
                            return Disconnect::StreamError;
                        }
                    }
                }
            }
        }
    }
}

/// Why `stream_until_disconnect` returned, determining whether the outer
/// loop backs off before reconnecting (§4.3 "reconnect with jittered
/// exponential backoff").
enum Disconnect {
    Cancelled,
    ConfigDisabled,
    StreamError,
}

#[cfg(test)]
#[path = "task_loop_tests.rs"]
mod tests;
