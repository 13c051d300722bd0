// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `PackageResource` (§4.5): desired install/removal state for one package
//! name, backed by the injected `PackageManager` capability. Owns the
//! apt self-heal retry policy (§7, S3) — the adapter itself only executes
//! the command it's told to.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use fleet_adapters::PackageManager;
use fleet_core::Resource;

use crate::caps::HostCaps;
use crate::error::ReconcileError;
use crate::kinds::{ManagedResource, ResourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum DesiredState {
    Installed,
    Removed,
}

#[derive(Debug, Deserialize)]
struct PackageSpec {
    name: String,
    desired_state: DesiredState,
}

pub struct PackageKind;

#[async_trait]
impl ResourceKind for PackageKind {
    async fn validate(
        &self,
        resource: &Resource,
        caps: &HostCaps,
    ) -> Result<Box<dyn ManagedResource>, ReconcileError> {
        let spec: PackageSpec = serde_json::from_value(resource.spec.clone())
            .map_err(|e| ReconcileError::Validate(format!("invalid package spec: {e}")))?;
        Ok(Box::new(PackageManaged {
            name: spec.name,
            desired_state: spec.desired_state,
            package_manager: Arc::clone(&caps.package_manager),
        }))
    }

    fn priority(&self) -> u8 {
        // Packages enforce after repositories and files (§4.5 "Ordering
        // rules"), so a newly-written repo or pinning file is visible to
        // the package manager before the install runs.
        2
    }
}

struct PackageManaged {
    name: String,
    desired_state: DesiredState,
    package_manager: Arc<dyn PackageManager>,
}

#[async_trait]
impl ManagedResource for PackageManaged {
    async fn check(&self) -> Result<bool, ReconcileError> {
        let installed = self
            .package_manager
            .is_installed(&self.name)
            .await
            .map_err(|e| ReconcileError::Check(e.to_string()))?;
        Ok(match self.desired_state {
            DesiredState::Installed => installed,
            DesiredState::Removed => !installed,
        })
    }

    async fn enforce(&self) -> Result<(), ReconcileError> {
        match self.desired_state {
            DesiredState::Installed => self.install_with_self_heal().await,
            DesiredState::Removed => self
                .package_manager
                .remove(&self.name)
                .await
                .map_err(|e| ReconcileError::Enforce(e.to_string())),
        }
    }

    fn populate_output(&self) -> Value {
        json!({ "name": self.name, "desired_state": format!("{:?}", self.desired_state).to_uppercase() })
    }

    async fn cleanup(&self) {}
}

impl PackageManaged {
    /// §4.5 / §7 / S3: on an install failure whose stderr mentions the
    /// dpkg repair command, run it once and retry the original install
    /// once. Independently, a failure mentioning a downgrade conflict is
    /// retried once with `allow_downgrade`. Each branch fires at most once.
    async fn install_with_self_heal(&self) -> Result<(), ReconcileError> {
        match self.package_manager.install(&self.name, false).await {
            Ok(()) => Ok(()),
            Err(e) if e.stderr().contains("dpkg --configure -a") => {
                tracing::warn!(name = %self.name, "package manager reported broken dpkg state, repairing");
                self.package_manager
                    .repair()
                    .await
                    .map_err(|e| ReconcileError::Enforce(e.to_string()))?;
                match self.package_manager.install(&self.name, false).await {
                    Ok(()) => Ok(()),
                    Err(e) => self.retry_with_downgrade_if_indicated(&e).await,
                }
            }
            Err(e) => self.retry_with_downgrade_if_indicated(&e).await,
        }
    }

    async fn retry_with_downgrade_if_indicated(
        &self,
        err: &fleet_adapters::PackageManagerError,
    ) -> Result<(), ReconcileError> {
        if err.stderr().contains("packages were downgraded") {
            tracing::warn!(name = %self.name, "retrying install with downgrades allowed");
            self.package_manager
                .install(&self.name, true)
                .await
                .map_err(|e| ReconcileError::Enforce(e.to_string()))
        } else {
            Err(ReconcileError::Enforce(err.to_string()))
        }
    }
}

#[cfg(test)]
#[path = "package_tests.rs"]
mod tests;
