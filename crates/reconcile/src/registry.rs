// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ResourceRegistry` (§4.5): the dispatch table from a `Resource::kind` tag
//! to its `ResourceKind` implementation. An unrecognized tag is not a
//! registry error — it is reported per-resource as `UNSUPPORTED_KIND` by the
//! reconciler, so one unknown kind in a policy never blocks its siblings.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::kinds::{
    exec::ExecKind, file::FileKind, package::PackageKind, repository::RepositoryKind,
    service_account::ServiceAccountKind, ResourceKind,
};

#[derive(Clone, Default)]
pub struct ResourceRegistry {
    kinds: IndexMap<String, Arc<dyn ResourceKind>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tag: impl Into<String>, kind: Arc<dyn ResourceKind>) -> &mut Self {
        self.kinds.insert(tag.into(), kind);
        self
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn ResourceKind>> {
        self.kinds.get(tag).cloned()
    }

    /// Wires the five kinds named in §3: `Kind ∈ {Package, Repository, File,
    /// Exec, ServiceAccount, (extensible)}`. Additional kinds register
    /// through [`ResourceRegistry::register`] without touching this set.
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        registry
            .register("Package", Arc::new(PackageKind))
            .register("Repository", Arc::new(RepositoryKind))
            .register("File", Arc::new(FileKind))
            .register("Exec", Arc::new(ExecKind))
            .register("ServiceAccount", Arc::new(ServiceAccountKind));
        registry
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
