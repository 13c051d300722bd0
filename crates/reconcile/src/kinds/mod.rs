// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The uniform capability set every resource kind implements (§4.5):
//! `validate`, `check`, `enforce`, `populate_output`, `cleanup`.
//!
//! `validate` is the only method dispatched through [`ResourceKind`] (the
//! registry's entry); it returns a [`ManagedResource`], the per-resource
//! workspace (desired bytes, computed paths, cached capability handles)
//! that `check`/`enforce`/`cleanup` are then called on directly.

pub mod exec;
pub mod file;
pub mod package;
pub mod repository;
pub mod service_account;

use async_trait::async_trait;
use serde_json::Value;

use fleet_core::Resource;

use crate::caps::HostCaps;
use crate::error::ReconcileError;

/// A registered resource kind: the dispatch target for one `Resource::kind`
/// tag. Stateless — every capability it needs comes from `caps` at
/// `validate` time, never from fields on the kind implementation itself.
#[async_trait]
pub trait ResourceKind: Send + Sync {
    /// Parse `resource.spec`, acquire/compute whatever `check`/`enforce`
    /// need (repo file bytes and path, fetched GPG keyrings, package-manager
    /// presence, ...), and return the resulting workspace. A parse or
    /// capability failure here is reported as this resource's `ERROR` and
    /// does not block sibling resources in the group (§4.5 step 2).
    async fn validate(
        &self,
        resource: &Resource,
        caps: &HostCaps,
    ) -> Result<Box<dyn ManagedResource>, ReconcileError>;

    /// Enforce ordering priority within an active group: lower runs first.
    /// Repositories before files before packages (§4.5 "Ordering rules"),
    /// so a package install can rely on a repo file or pinning file written
    /// earlier in the same apply.
    fn priority(&self) -> u8;
}

/// The reconciler's private per-resource workspace (§3 `ManagedResource`).
/// Created once by `validate`; every other method may be called any number
/// of times (`check`/`enforce` during the apply, `cleanup` exactly once at
/// the end).
#[async_trait]
pub trait ManagedResource: Send + Sync {
    /// Side-effect-free: report whether the host already matches the
    /// desired state (§3 invariant 4).
    async fn check(&self) -> Result<bool, ReconcileError>;

    /// Idempotent: `enforce(); check()` must report `true` (§3 invariant 5).
    async fn enforce(&self) -> Result<(), ReconcileError>;

    /// Extra fields attached to this resource's `ComplianceReport.outputs`.
    fn populate_output(&self) -> Value;

    /// Runs regardless of outcome; failures are logged only (§4.5 step 6).
    async fn cleanup(&self);
}
