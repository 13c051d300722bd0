// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced wrapper adapters: add structured logging (entry, duration,
//! outcome) around each capability boundary without changing its contract.

use async_trait::async_trait;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::Instrument;

use crate::metadata_client::{MetadataClient, MetadataClientError};
use crate::package_manager::{PackageManager, PackageManagerError};
use crate::repo_writer::{RepoWriter, RepoWriterError};
use crate::rpc::{RpcError, TaskStreamReader, TaskStreamWriter, RPCClient};
use crate::script_runner::{ScriptRunner, ScriptRunnerError};
use fleet_core::{ConfigSnapshot, ExecRunResult, InventoryReport, TaskComplete, TaskNotification, TaskProgress};

/// Wraps any [`PackageManager`] with entry/duration/outcome logging.
#[derive(Clone)]
pub struct TracedPackageManager<P> {
    inner: P,
}

impl<P> TracedPackageManager<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: PackageManager> PackageManager for TracedPackageManager<P> {
    async fn is_installed(&self, name: &str) -> Result<bool, PackageManagerError> {
        self.inner.is_installed(name).await
    }

    async fn install(&self, name: &str, allow_downgrade: bool) -> Result<(), PackageManagerError> {
        async {
            tracing::info!(name, allow_downgrade, "installing package");
            let start = Instant::now();
            let result = self.inner.install(name, allow_downgrade).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(name, elapsed_ms, "package installed"),
                Err(e) => tracing::warn!(name, elapsed_ms, error = %e, "package install failed"),
            }
            result
        }
        .instrument(tracing::info_span!("package_manager.install", name))
        .await
    }

    async fn remove(&self, name: &str) -> Result<(), PackageManagerError> {
        async {
            tracing::info!(name, "removing package");
            let result = self.inner.remove(name).await;
            if let Err(ref e) = result {
                tracing::warn!(name, error = %e, "package remove failed");
            }
            result
        }
        .instrument(tracing::info_span!("package_manager.remove", name))
        .await
    }

    async fn repair(&self) -> Result<(), PackageManagerError> {
        tracing::warn!("running package-manager self-heal");
        let result = self.inner.repair().await;
        match &result {
            Ok(()) => tracing::info!("self-heal completed"),
            Err(e) => tracing::error!(error = %e, "self-heal failed"),
        }
        result
    }
}

/// Wraps any [`RepoWriter`] with entry/duration/outcome logging.
#[derive(Clone)]
pub struct TracedRepoWriter<R> {
    inner: R,
}

impl<R> TracedRepoWriter<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: RepoWriter> RepoWriter for TracedRepoWriter<R> {
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), RepoWriterError> {
        let span = tracing::info_span!("repo_writer.write_atomic", path = %path.display(), bytes = contents.len());
        async {
            let result = self.inner.write_atomic(path, contents).await;
            match &result {
                Ok(()) => tracing::info!("wrote file"),
                Err(e) => tracing::error!(error = %e, "write failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, RepoWriterError> {
        self.inner.read(path).await
    }

    async fn remove(&self, path: &Path) -> Result<(), RepoWriterError> {
        let result = self.inner.remove(path).await;
        if let Err(ref e) = result {
            tracing::warn!(path = %path.display(), error = %e, "remove failed");
        }
        result
    }
}

/// Wraps any [`ScriptRunner`] with entry/duration/outcome logging.
#[derive(Clone)]
pub struct TracedScriptRunner<S> {
    inner: S,
}

impl<S> TracedScriptRunner<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ScriptRunner> ScriptRunner for TracedScriptRunner<S> {
    async fn run(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecRunResult, ScriptRunnerError> {
        let span = tracing::info_span!("script_runner.run", timeout_secs = timeout.as_secs());
        async {
            tracing::info!("running script");
            let result = self.inner.run(command, timeout).await;
            match &result {
                Ok(r) => tracing::info!(exit_code = r.exit_code, duration_ms = r.duration_ms, "script finished"),
                Err(e) => tracing::warn!(error = %e, "script failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wraps any [`MetadataClient`] with entry/duration/outcome logging.
#[derive(Clone)]
pub struct TracedMetadataClient<M> {
    inner: M,
}

impl<M> TracedMetadataClient<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<M: MetadataClient> MetadataClient for TracedMetadataClient<M> {
    async fn wait_for_change(
        &self,
        etag: Option<&str>,
    ) -> Result<(ConfigSnapshot, String), MetadataClientError> {
        let start = Instant::now();
        let result = self.inner.wait_for_change(etag).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok((_, etag)) => tracing::debug!(etag, elapsed_ms, "config watcher: snapshot refreshed"),
            Err(e) => tracing::warn!(elapsed_ms, error = %e, "config watcher: fetch failed"),
        }
        result
    }
}

/// Wraps any [`RPCClient`] with entry/duration/outcome logging. The
/// read/write halves returned by `open_task_stream` are each wrapped so
/// progress/complete sends and receives are logged too.
#[derive(Clone)]
pub struct TracedRpcClient<C> {
    inner: C,
}

impl<C> TracedRpcClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: RPCClient> RPCClient for TracedRpcClient<C> {
    async fn register(&self, project_id: &str, instance_name: &str) -> Result<(), RpcError> {
        let span = tracing::info_span!("rpc.register", project_id, instance_name);
        async {
            let start = Instant::now();
            let result = self.inner.register(project_id, instance_name).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "registered"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "registration failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn report_inventory(&self, report: &InventoryReport) -> Result<(), RpcError> {
        let result = self.inner.report_inventory(report).await;
        match &result {
            Ok(()) => tracing::debug!("inventory report sent"),
            Err(e) => tracing::warn!(error = %e, "inventory report failed"),
        }
        result
    }

    async fn open_task_stream(
        &self,
        project_id: &str,
        instance_name: &str,
    ) -> Result<(Box<dyn TaskStreamReader>, Box<dyn TaskStreamWriter>), RpcError> {
        tracing::info!(project_id, instance_name, "opening task-notification stream");
        let (reader, writer) = self.inner.open_task_stream(project_id, instance_name).await?;
        Ok((
            Box::new(TracedTaskStreamReader { inner: reader }),
            Box::new(TracedTaskStreamWriter { inner: writer }),
        ))
    }
}

struct TracedTaskStreamReader {
    inner: Box<dyn TaskStreamReader>,
}

#[async_trait]
impl TaskStreamReader for TracedTaskStreamReader {
    async fn recv(&mut self) -> Result<Option<TaskNotification>, RpcError> {
        let result = self.inner.recv().await;
        match &result {
            Ok(Some(n)) => tracing::info!(task_id = %n.task_id, task_type = ?n.task_type, "task start received"),
            Ok(None) => tracing::info!("stream closed by peer"),
            Err(e) => tracing::warn!(error = %e, "stream recv failed"),
        }
        result
    }
}

struct TracedTaskStreamWriter {
    inner: Box<dyn TaskStreamWriter>,
}

#[async_trait]
impl TaskStreamWriter for TracedTaskStreamWriter {
    async fn send_progress(&mut self, progress: TaskProgress) -> Result<(), RpcError> {
        tracing::debug!(task_id = %progress.task_id, percent = progress.percent_complete, "sending progress");
        self.inner.send_progress(progress).await
    }

    async fn send_complete(&mut self, complete: TaskComplete) -> Result<(), RpcError> {
        tracing::info!(task_id = %complete.task_id, status = ?complete.status, "sending complete");
        self.inner.send_complete(complete).await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
