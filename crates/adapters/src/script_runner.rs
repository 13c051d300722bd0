// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ScriptRunner` capability: runs an `Exec` resource's command or an
//! `ExecStep` task's command and returns a bounded-size `ExecRunResult`.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;

use crate::subprocess::run_with_timeout;
use fleet_core::ExecRunResult;

/// Default per-exec timeout: 15 minutes.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Tail length kept from stdout/stderr so a runaway script can't blow up the
/// progress/report payload.
const OUTPUT_TAIL_BYTES: usize = 4096;

#[derive(Debug, Error)]
pub enum ScriptRunnerError {
    #[error("script timed out: {0}")]
    Timeout(String),
    #[error("io error: {0}")]
    Io(String),
}

/// Runs an arbitrary shell command with a timeout, returning exit code and
/// tails of stdout/stderr rather than the full (possibly huge) output.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecRunResult, ScriptRunnerError>;
}

fn tail(bytes: &[u8], max: usize) -> String {
    let s = String::from_utf8_lossy(bytes);
    if s.len() <= max {
        s.into_owned()
    } else {
        s[s.len() - max..].to_string()
    }
}

#[async_trait]
impl<T: ScriptRunner + ?Sized> ScriptRunner for std::sync::Arc<T> {
    async fn run(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecRunResult, ScriptRunnerError> {
        (**self).run(command, timeout).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubprocessScriptRunner;

#[async_trait]
impl ScriptRunner for SubprocessScriptRunner {
    async fn run(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecRunResult, ScriptRunnerError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        let start = Instant::now();
        let output = run_with_timeout(cmd, timeout, "exec script")
            .await
            .map_err(|e| {
                if e.contains("timed out") {
                    ScriptRunnerError::Timeout(e)
                } else {
                    ScriptRunnerError::Io(e)
                }
            })?;
        Ok(ExecRunResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout_tail: tail(&output.stdout, OUTPUT_TAIL_BYTES),
            stderr_tail: tail(&output.stderr, OUTPUT_TAIL_BYTES),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeScriptRunner;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// In-memory script runner: returns a scripted result per exact command
    /// string, or a default success with empty output.
    #[derive(Default)]
    pub struct FakeScriptRunner {
        scripted: Mutex<HashMap<String, ExecRunResult>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeScriptRunner {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn script(&self, command: impl Into<String>, result: ExecRunResult) {
            self.scripted.lock().insert(command.into(), result);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ScriptRunner for FakeScriptRunner {
        async fn run(
            &self,
            command: &str,
            _timeout: Duration,
        ) -> Result<ExecRunResult, ScriptRunnerError> {
            self.calls.lock().push(command.to_string());
            Ok(self
                .scripted
                .lock()
                .get(command)
                .cloned()
                .unwrap_or(ExecRunResult {
                    exit_code: 0,
                    stdout_tail: String::new(),
                    stderr_tail: String::new(),
                    duration_ms: 0,
                }))
        }
    }
}

#[cfg(test)]
#[path = "script_runner_tests.rs"]
mod tests;
