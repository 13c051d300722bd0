// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `FileResource`: desired file content (inline or fetched, 1 MiB cap) and
//! a present/absent state. Unlike `RepositoryResource`, the target path is
//! given directly rather than derived from the content, so an existing
//! mismatch is an ordinary non-compliance, not a collision — overwriting
//! is always correct here.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use fleet_adapters::RepoWriter;
use fleet_core::Resource;

use crate::caps::HostCaps;
use crate::error::ReconcileError;
use crate::kinds::{ManagedResource, ResourceKind};
use crate::support::fetch_bounded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum FileState {
    Present,
    Absent,
}

#[derive(Debug, Deserialize)]
struct FileSpec {
    path: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    content_url: Option<String>,
    #[serde(default = "default_state")]
    state: FileState,
}

fn default_state() -> FileState {
    FileState::Present
}

pub struct FileKind;

#[async_trait]
impl ResourceKind for FileKind {
    async fn validate(
        &self,
        resource: &Resource,
        caps: &HostCaps,
    ) -> Result<Box<dyn ManagedResource>, ReconcileError> {
        let spec: FileSpec = serde_json::from_value(resource.spec.clone())
            .map_err(|e| ReconcileError::Validate(format!("invalid file spec: {e}")))?;

        let desired = match spec.state {
            FileState::Absent => None,
            FileState::Present => Some(match (spec.content, spec.content_url) {
                (Some(inline), _) => inline.into_bytes(),
                (None, Some(url)) => fetch_bounded(&caps.http_client, &url, caps.max_fetch_bytes).await?,
                (None, None) => {
                    return Err(ReconcileError::Validate(
                        "file resource in state PRESENT needs content or content_url".to_string(),
                    ))
                }
            }),
        };

        Ok(Box::new(FileManaged {
            path: PathBuf::from(spec.path),
            desired,
            repo_writer: Arc::clone(&caps.repo_writer),
        }))
    }

    fn priority(&self) -> u8 {
        // After repositories, before packages (§4.5 "FileResource (ADDED)"):
        // a pinning/config file may need to exist before a package install
        // reads it.
        1
    }
}

struct FileManaged {
    path: PathBuf,
    /// `None` means the desired state is ABSENT.
    desired: Option<Vec<u8>>,
    repo_writer: Arc<dyn RepoWriter>,
}

#[async_trait]
impl ManagedResource for FileManaged {
    async fn check(&self) -> Result<bool, ReconcileError> {
        let existing = self
            .repo_writer
            .read(&self.path)
            .await
            .map_err(|e| ReconcileError::Check(e.to_string()))?;
        Ok(existing.as_ref() == self.desired.as_ref())
    }

    async fn enforce(&self) -> Result<(), ReconcileError> {
        match &self.desired {
            Some(contents) => self
                .repo_writer
                .write_atomic(&self.path, contents)
                .await
                .map_err(|e| ReconcileError::Enforce(e.to_string())),
            None => self
                .repo_writer
                .remove(&self.path)
                .await
                .map_err(|e| ReconcileError::Enforce(e.to_string())),
        }
    }

    fn populate_output(&self) -> Value {
        json!({
            "path": self.path.display().to_string(),
            "state": if self.desired.is_some() { "PRESENT" } else { "ABSENT" },
        })
    }

    async fn cleanup(&self) {}
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
