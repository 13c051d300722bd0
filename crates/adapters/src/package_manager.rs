// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `PackageManager` capability backing `PackageResource`.
//!
//! The concrete package-manager families (apt/yum/zypper/googet/msi/wua/rpm)
//! are external collaborators; this module defines the capability trait the
//! reconciler depends on and one reference backend (`apt`, via subprocess).
//! The reconciler's `PackageResource` kind owns the self-heal retry policy,
//! not this adapter.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use crate::subprocess::{run_with_timeout, PACKAGE_MANAGER_TIMEOUT};

#[derive(Debug, Error)]
pub enum PackageManagerError {
    #[error("{message}")]
    CommandFailed { message: String, stderr: String },
    #[error("io error: {0}")]
    Io(String),
}

impl PackageManagerError {
    pub fn stderr(&self) -> &str {
        match self {
            Self::CommandFailed { stderr, .. } => stderr,
            Self::Io(_) => "",
        }
    }
}

/// Non-interactive package install/remove/query, abstracted over the
/// concrete package-manager family. The reconciler never branches on OS —
/// one implementation is selected once at startup.
#[async_trait]
pub trait PackageManager: Send + Sync {
    async fn is_installed(&self, name: &str) -> Result<bool, PackageManagerError>;

    /// Install `name`. `allow_downgrade` is set by the caller on retry after
    /// a "packages were downgraded" failure.
    async fn install(&self, name: &str, allow_downgrade: bool) -> Result<(), PackageManagerError>;

    async fn remove(&self, name: &str) -> Result<(), PackageManagerError>;

    /// Best-effort self-heal for a corrupt package database (e.g.
    /// `dpkg --configure -a`). Called once by the reconciler when an
    /// install/remove failure's stderr indicates the repair command.
    async fn repair(&self) -> Result<(), PackageManagerError>;
}

#[async_trait]
impl<T: PackageManager + ?Sized> PackageManager for std::sync::Arc<T> {
    async fn is_installed(&self, name: &str) -> Result<bool, PackageManagerError> {
        (**self).is_installed(name).await
    }

    async fn install(&self, name: &str, allow_downgrade: bool) -> Result<(), PackageManagerError> {
        (**self).install(name, allow_downgrade).await
    }

    async fn remove(&self, name: &str) -> Result<(), PackageManagerError> {
        (**self).remove(name).await
    }

    async fn repair(&self) -> Result<(), PackageManagerError> {
        (**self).repair().await
    }
}

/// Environment applied to every package-manager subprocess: non-interactive,
/// no TTY prompts.
fn noninteractive_env(cmd: &mut Command) {
    cmd.env("DEBIAN_FRONTEND", "noninteractive");
    cmd.env("APT_LISTCHANGES_FRONTEND", "none");
}

/// Reference apt/dpkg backend, invoked via subprocess.
#[derive(Debug, Clone, Default)]
pub struct AptPackageManager {
    timeout: Duration,
}

impl AptPackageManager {
    pub fn new() -> Self {
        Self {
            timeout: PACKAGE_MANAGER_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, mut cmd: Command, description: &str) -> Result<(), PackageManagerError> {
        noninteractive_env(&mut cmd);
        let output = run_with_timeout(cmd, self.timeout, description)
            .await
            .map_err(PackageManagerError::Io)?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Err(PackageManagerError::CommandFailed {
            message: format!(
                "{description} exited with {}",
                output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string())
            ),
            stderr,
        })
    }
}

#[async_trait]
impl PackageManager for AptPackageManager {
    async fn is_installed(&self, name: &str) -> Result<bool, PackageManagerError> {
        let mut cmd = Command::new("dpkg-query");
        cmd.args(["-W", "-f=${Status}", name]);
        let output = run_with_timeout(cmd, self.timeout, "dpkg-query")
            .await
            .map_err(PackageManagerError::Io)?;
        if !output.status.success() {
            return Ok(false);
        }
        let status = String::from_utf8_lossy(&output.stdout).to_string();
        Ok(status.trim() == "install ok installed")
    }

    async fn install(&self, name: &str, allow_downgrade: bool) -> Result<(), PackageManagerError> {
        let mut cmd = Command::new("apt-get");
        cmd.args(["install", "-y"]);
        if allow_downgrade {
            cmd.arg("--allow-downgrades");
        }
        cmd.arg(name);
        self.run(cmd, "apt-get install").await
    }

    async fn remove(&self, name: &str) -> Result<(), PackageManagerError> {
        let mut cmd = Command::new("apt-get");
        cmd.args(["remove", "-y", name]);
        self.run(cmd, "apt-get remove").await
    }

    async fn repair(&self) -> Result<(), PackageManagerError> {
        let mut cmd = Command::new("dpkg");
        cmd.args(["--configure", "-a"]);
        self.run(cmd, "dpkg --configure -a").await
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCall, FakePackageManager};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum FakeCall {
        IsInstalled(String),
        Install { name: String, allow_downgrade: bool },
        Remove(String),
        Repair,
    }

    /// In-memory package manager for reconciler tests. `fail_install_once`
    /// lets a test simulate the dpkg-broken self-heal path:
    /// the first `install` for a given name fails with the repair-hint
    /// stderr, `repair()` "fixes" it, and the retried install succeeds.
    #[derive(Default)]
    pub struct FakePackageManager {
        installed: Mutex<HashMap<String, bool>>,
        calls: Mutex<Vec<FakeCall>>,
        fail_install_once: Mutex<HashMap<String, String>>,
        repaired: Mutex<bool>,
    }

    impl FakePackageManager {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn seed_installed(&self, name: impl Into<String>, installed: bool) {
            self.installed.lock().insert(name.into(), installed);
        }

        /// Next `install(name)` call fails once with `stderr`; a subsequent
        /// call (after `repair()` or with `allow_downgrade`) succeeds.
        pub fn fail_next_install(&self, name: impl Into<String>, stderr: impl Into<String>) {
            self.fail_install_once
                .lock()
                .insert(name.into(), stderr.into());
        }

        pub fn calls(&self) -> Vec<FakeCall> {
            self.calls.lock().clone()
        }

        pub fn was_repaired(&self) -> bool {
            *self.repaired.lock()
        }
    }

    #[async_trait]
    impl PackageManager for FakePackageManager {
        async fn is_installed(&self, name: &str) -> Result<bool, PackageManagerError> {
            self.calls
                .lock()
                .push(FakeCall::IsInstalled(name.to_string()));
            Ok(*self.installed.lock().get(name).unwrap_or(&false))
        }

        async fn install(
            &self,
            name: &str,
            allow_downgrade: bool,
        ) -> Result<(), PackageManagerError> {
            self.calls.lock().push(FakeCall::Install {
                name: name.to_string(),
                allow_downgrade,
            });
            if let Some(stderr) = self.fail_install_once.lock().remove(name) {
                return Err(PackageManagerError::CommandFailed {
                    message: "apt-get install exited with 100".to_string(),
                    stderr,
                });
            }
            self.installed.lock().insert(name.to_string(), true);
            Ok(())
        }

        async fn remove(&self, name: &str) -> Result<(), PackageManagerError> {
            self.calls.lock().push(FakeCall::Remove(name.to_string()));
            self.installed.lock().insert(name.to_string(), false);
            Ok(())
        }

        async fn repair(&self) -> Result<(), PackageManagerError> {
            self.calls.lock().push(FakeCall::Repair);
            *self.repaired.lock() = true;
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "package_manager_tests.rs"]
mod tests;
