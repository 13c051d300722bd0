// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AccountManager` capability backing `ServiceAccountResource`.
//!
//! Intentionally thin: no Windows-specific account APIs are modeled. The
//! capability trait exists so the resource registry's dispatch table is
//! complete for the extensible `Kind` set, but the only backend shipped
//! here is a no-op that reports every account as already present. A real
//! backend (useradd/usermod, or the Windows local accounts API) is an
//! external collaborator, same as the package-manager back-ends.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountManagerError {
    #[error("account operation failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait AccountManager: Send + Sync {
    async fn user_exists(&self, name: &str) -> Result<bool, AccountManagerError>;
    async fn ensure_user(&self, name: &str) -> Result<(), AccountManagerError>;
}

#[async_trait]
impl<T: AccountManager + ?Sized> AccountManager for std::sync::Arc<T> {
    async fn user_exists(&self, name: &str) -> Result<bool, AccountManagerError> {
        (**self).user_exists(name).await
    }

    async fn ensure_user(&self, name: &str) -> Result<(), AccountManagerError> {
        (**self).ensure_user(name).await
    }
}

/// Reports every account as already present. Logs once per call so the
/// thinness of this kind is visible in the daemon's own logs rather than
/// silently pretending to manage accounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAccountManager;

#[async_trait]
impl AccountManager for NoopAccountManager {
    async fn user_exists(&self, name: &str) -> Result<bool, AccountManagerError> {
        tracing::warn!(name, "service account management is not implemented; reporting compliant");
        Ok(true)
    }

    async fn ensure_user(&self, name: &str) -> Result<(), AccountManagerError> {
        tracing::warn!(name, "service account management is not implemented; no-op enforce");
        Ok(())
    }
}
