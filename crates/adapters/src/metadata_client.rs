// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `MetadataClient` capability consumed by `ConfigWatcher` (§4.2): a
//! long-poll `wait_for_change` read of the host-local metadata endpoint,
//! with an ETag-equivalent so the server can block until something changes.

use async_trait::async_trait;
use fleet_core::ConfigSnapshot;
use thiserror::Error;
use std::time::Duration;

#[derive(Debug, Error)]
pub enum MetadataClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed metadata response: {0}")]
    Malformed(String),
}

/// One long-poll round: block (up to the adapter's own timeout) until the
/// metadata server reports a change since `etag`, then return the new
/// snapshot and its etag. A timed-out long-poll with no change is not an
/// error — the caller loops and calls again (§4.2).
#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn wait_for_change(
        &self,
        etag: Option<&str>,
    ) -> Result<(ConfigSnapshot, String), MetadataClientError>;
}

#[async_trait]
impl<T: MetadataClient + ?Sized> MetadataClient for std::sync::Arc<T> {
    async fn wait_for_change(
        &self,
        etag: Option<&str>,
    ) -> Result<(ConfigSnapshot, String), MetadataClientError> {
        (**self).wait_for_change(etag).await
    }
}

/// Production client against the instance metadata server's `wait_for_change`
/// endpoint, using `reqwest` with the long-poll and fallback timeouts from
/// [`crate::env`].
pub struct HttpMetadataClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMetadataClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MetadataClient for HttpMetadataClient {
    async fn wait_for_change(
        &self,
        etag: Option<&str>,
    ) -> Result<(ConfigSnapshot, String), MetadataClientError> {
        let mut req = self
            .client
            .get(format!("{}/computeMetadata/v1/instance/attributes/", self.base_url))
            .header("Metadata-Flavor", "Google")
            .timeout(crate::env::metadata_longpoll_ms());
        if let Some(etag) = etag {
            req = req.header("If-None-Match", etag);
        }

        let response = req
            .send()
            .await
            .map_err(|e| MetadataClientError::Transport(e.to_string()))?;

        let etag = response
            .headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let snapshot: ConfigSnapshot = response
            .json()
            .await
            .map_err(|e| MetadataClientError::Malformed(e.to_string()))?;

        Ok((snapshot, etag))
    }
}

/// Retry `wait_for_change` with capped exponential backoff on transport
/// errors, surfacing the last good snapshot rather than propagating the
/// error indefinitely (§4.2 "On transport error, retries with capped
/// exponential backoff; surfaces the last good snapshot"). Returns `None`
/// only when `max_attempts` is exhausted without a single success, which the
/// caller treats as fatal on the very first call (§4.2 "permanent failure is
/// fatal").
pub async fn wait_for_change_with_retry(
    client: &dyn MetadataClient,
    etag: Option<&str>,
    max_attempts: u32,
) -> Result<(ConfigSnapshot, String), MetadataClientError> {
    let mut last_err = None;
    for attempt in 0..max_attempts {
        match client.wait_for_change(etag).await {
            Ok(result) => return Ok(result),
            Err(e) => {
                tracing::warn!(attempt, error = %e, "config watcher: metadata fetch failed, retrying");
                last_err = Some(e);
                let backoff = fleet_core::jitter::backoff(
                    Duration::from_millis(500),
                    Duration::from_secs(30),
                    attempt,
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
    Err(last_err.unwrap_or(MetadataClientError::Transport("exhausted retries".to_string())))
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeMetadataClient;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Scripted metadata client: yields snapshots from a queue, optionally
    /// failing the next N calls first.
    #[derive(Default)]
    pub struct FakeMetadataClient {
        snapshots: Mutex<VecDeque<ConfigSnapshot>>,
        fail_next: Mutex<u32>,
        calls: Mutex<u32>,
    }

    impl FakeMetadataClient {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn push(&self, snapshot: ConfigSnapshot) {
            self.snapshots.lock().push_back(snapshot);
        }

        pub fn fail_next_n(&self, n: u32) {
            *self.fail_next.lock() = n;
        }

        pub fn call_count(&self) -> u32 {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl MetadataClient for FakeMetadataClient {
        async fn wait_for_change(
            &self,
            _etag: Option<&str>,
        ) -> Result<(ConfigSnapshot, String), MetadataClientError> {
            *self.calls.lock() += 1;
            {
                let mut fail_next = self.fail_next.lock();
                if *fail_next > 0 {
                    *fail_next -= 1;
                    return Err(MetadataClientError::Transport("simulated failure".to_string()));
                }
            }
            let snapshot = self
                .snapshots
                .lock()
                .pop_front()
                .unwrap_or_default();
            let etag = format!("etag-{}", *self.calls.lock());
            Ok((snapshot, etag))
        }
    }
}

#[cfg(test)]
#[path = "metadata_client_tests.rs"]
mod tests;
