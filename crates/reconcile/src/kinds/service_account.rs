// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ServiceAccountResource`: keeps the `Kind ∈ {..., ServiceAccount,
//! (extensible)}` registry contract honest. Delegates to the thin
//! `AccountManager` capability; no Windows-specific account APIs are
//! modeled here.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use fleet_adapters::AccountManager;
use fleet_core::Resource;

use crate::caps::HostCaps;
use crate::error::ReconcileError;
use crate::kinds::{ManagedResource, ResourceKind};

#[derive(Debug, Deserialize)]
struct ServiceAccountSpec {
    name: String,
}

pub struct ServiceAccountKind;

#[async_trait]
impl ResourceKind for ServiceAccountKind {
    async fn validate(
        &self,
        resource: &Resource,
        caps: &HostCaps,
    ) -> Result<Box<dyn ManagedResource>, ReconcileError> {
        let spec: ServiceAccountSpec = serde_json::from_value(resource.spec.clone())
            .map_err(|e| ReconcileError::Validate(format!("invalid service account spec: {e}")))?;
        Ok(Box::new(ServiceAccountManaged {
            name: spec.name,
            account_manager: Arc::clone(&caps.account_manager),
        }))
    }

    fn priority(&self) -> u8 {
        4
    }
}

struct ServiceAccountManaged {
    name: String,
    account_manager: Arc<dyn AccountManager>,
}

#[async_trait]
impl ManagedResource for ServiceAccountManaged {
    async fn check(&self) -> Result<bool, ReconcileError> {
        self.account_manager
            .user_exists(&self.name)
            .await
            .map_err(|e| ReconcileError::Check(e.to_string()))
    }

    async fn enforce(&self) -> Result<(), ReconcileError> {
        self.account_manager
            .ensure_user(&self.name)
            .await
            .map_err(|e| ReconcileError::Enforce(e.to_string()))
    }

    fn populate_output(&self) -> Value {
        json!({ "name": self.name })
    }

    async fn cleanup(&self) {}
}

#[cfg(test)]
#[path = "service_account_tests.rs"]
mod tests;
