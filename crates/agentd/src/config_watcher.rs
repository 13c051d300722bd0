// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ConfigWatcher` (§4.2): long-polls the host-local metadata endpoint and
//! fans out the resulting `ConfigSnapshot` to subscribers over a
//! `tokio::sync::watch` channel (§4.2 "Subscriber fan-out (ADDED)") rather
//! than a global mutable config (§9 "Avoid global mutable config").

use std::sync::Arc;

use fleet_adapters::{wait_for_change_with_retry, MetadataClient, MetadataClientError};
use fleet_core::ConfigSnapshot;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// A read-only handle on the current config snapshot. Cloning shares the
/// underlying channel; every holder sees the same sequence of updates.
#[derive(Clone)]
pub struct ConfigWatcher {
    rx: watch::Receiver<ConfigSnapshot>,
}

impl ConfigWatcher {
    /// Block on the first `wait_for_change` call and start the background
    /// long-poll loop. The initial call must succeed — permanent failure is
    /// fatal at startup (§4.2).
    pub async fn start(
        client: Arc<dyn MetadataClient>,
        cancel: CancellationToken,
    ) -> Result<Self, MetadataClientError> {
        const INITIAL_ATTEMPTS: u32 = 5;
        let (snapshot, etag) =
            wait_for_change_with_retry(client.as_ref(), None, INITIAL_ATTEMPTS).await?;

        let (tx, rx) = watch::channel(snapshot);
        tokio::spawn(Self::run(client, tx, etag, cancel));

        Ok(Self { rx })
    }

    /// Current snapshot, without waiting for a change.
    pub fn current(&self) -> ConfigSnapshot {
        self.rx.borrow().clone()
    }

    /// A receiver that resolves on every subsequent change, mirroring the
    /// way `ServiceLoop` and `PeriodicSupervisor` each hold their own
    /// receiver and react to `changed()` (§4.2).
    pub fn subscribe(&self) -> watch::Receiver<ConfigSnapshot> {
        self.rx.clone()
    }

    async fn run(
        client: Arc<dyn MetadataClient>,
        tx: watch::Sender<ConfigSnapshot>,
        mut etag: String,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("config watcher: shutting down");
                    return;
                }
                result = client.wait_for_change(Some(&etag)) => {
                    match result {
                        Ok((snapshot, new_etag)) => {
                            etag = new_etag;
                            if tx.send(snapshot).is_err() {
                                tracing::debug!("config watcher: no subscribers left");
                                return;
                            }
                        }
                        Err(e) => {
                            // §4.2: transport errors retry with capped backoff and
                            // surface the last good snapshot; the watcher never
                            // tears down the channel over a transient failure.
                            tracing::warn!(error = %e, "config watcher: long-poll failed, backing off");
                            tokio::time::sleep(fleet_adapters::env::metadata_fallback_poll_ms()).await;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "config_watcher_tests.rs"]
mod tests;
