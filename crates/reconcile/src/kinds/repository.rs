// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RepositoryResource` (§4.5, S1, S2): renders a canonical package-manager
//! repo definition, writes it (and, for apt, a re-serialized GPG keyring) to
//! a path derived purely from `sha256(contents)`.
//!
//! Because the path is a pure function of the contents, an existing file at
//! the target path with *different* bytes cannot mean "needs updating" —
//! updating *always* changes the path too. It can only mean two distinct
//! specs collided on the same 10-hex-char digest prefix (§9). `enforce`
//! detects this and fails the resource rather than overwriting.

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
use crate::support::{first10, sha256_hex};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RepositorySpec {
    Apt {
        uri: String,
        dist: String,
        components: Vec<String>,
        #[serde(default)]
        gpg_key: Option<String>,
    },
    Yum {
        id: String,
        #[serde(default)]
        display_name: Option<String>,
        base_url: String,
        #[serde(default)]
        gpg_keys: Vec<String>,
    },
    Zypper {
        id: String,
        #[serde(default)]
        display_name: Option<String>,
        base_url: String,
        #[serde(default)]
        gpg_keys: Vec<String>,
    },
    Googet {
        name: String,
        url: String,
    },
}

const MANAGED_BY_COMMENT: &str = "# Repo file managed by Google OSConfig agent";

fn render_yum_style(id: &str, display_name: Option<&str>, base_url: &str, gpg_keys: &[String]) -> String {
    let name = display_name.unwrap_or(id);
    let mut out = format!(
        "{MANAGED_BY_COMMENT}\n[{id}]\nname={name}\nbaseurl={base_url}\nenabled=1\n"
    );
    if gpg_keys.is_empty() {
        out.push_str("gpgcheck=0\n");
    } else {
        out.push_str("gpgcheck=1\n");
        out.push_str(&format!("gpgkey={}\n", gpg_keys[0]));
        for key in &gpg_keys[1..] {
            out.push_str(&format!("       {key}\n"));
        }
    }
    out
}

pub struct RepositoryKind;

#[async_trait]
impl ResourceKind for RepositoryKind {
    async fn validate(
        &self,
        resource: &Resource,
        caps: &HostCaps,
    ) -> Result<Box<dyn ManagedResource>, ReconcileError> {
        let spec: RepositorySpec = serde_json::from_value(resource.spec.clone())
            .map_err(|e| ReconcileError::Validate(format!("invalid repository spec: {e}")))?;

        let (repo_contents, repo_path_template, gpg_key_url) = match &spec {
            RepositorySpec::Apt { uri, dist, components, gpg_key } => (
                format!("{MANAGED_BY_COMMENT}\ndeb {uri} {dist} {}\n", components.join(" ")),
                "/etc/apt/sources.list.d/osconfig_added_{digest}.list",
                gpg_key.clone(),
            ),
            RepositorySpec::Yum { id, display_name, base_url, gpg_keys } => (
                render_yum_style(id, display_name.as_deref(), base_url, gpg_keys),
                "/etc/yum.repos.d/osconfig_added_{digest}.repo",
                None,
            ),
            RepositorySpec::Zypper { id, display_name, base_url, gpg_keys } => (
                render_yum_style(id, display_name.as_deref(), base_url, gpg_keys),
                "/etc/zypp/repos.d/osconfig_added_{digest}.repo",
                None,
            ),
            RepositorySpec::Googet { name, url } => (
                format!("{MANAGED_BY_COMMENT}\nname: {name}\nurl: {url}\n"),
                "/etc/googet/repos/osconfig_added_{digest}.repo",
                None,
            ),
        };

        let digest = sha256_hex(repo_contents.as_bytes());
        let repo_path = PathBuf::from(repo_path_template.replace("{digest}", first10(&digest)));

        let (gpg_path, gpg_contents) = match gpg_key_url {
            None => (None, None),
            Some(url) => {
                let keyring = fleet_adapters::fetch_and_serialize_keyring(
                    &caps.http_client,
                    &url,
                    caps.max_fetch_bytes,
                )
                .await
                .map_err(|e| ReconcileError::Fetch(e.to_string()))?;
                let key_digest = sha256_hex(&keyring);
                let path = PathBuf::from(format!(
                    "/etc/apt/trusted.gpg.d/osconfig_added_{key_digest}.gpg"
                ));
                (Some(path), Some(keyring))
            }
        };

        Ok(Box::new(RepositoryManaged {
            repo_path,
            repo_contents: repo_contents.into_bytes(),
            gpg_path,
            gpg_contents,
            repo_writer: Arc::clone(&caps.repo_writer),
        }))
    }

    fn priority(&self) -> u8 {
        // Repositories enforce first (§4.5 "Ordering rules") so packages
        // installed later in the same apply can use them.
        0
    }
}

struct RepositoryManaged {
    repo_path: PathBuf,
    repo_contents: Vec<u8>,
    gpg_path: Option<PathBuf>,
    gpg_contents: Option<Vec<u8>>,
    repo_writer: Arc<dyn RepoWriter>,
}

impl RepositoryManaged {
    async fn file_matches(&self, path: &PathBuf, desired: &[u8]) -> Result<bool, ReconcileError> {
        let existing = self
            .repo_writer
            .read(path)
            .await
            .map_err(|e| ReconcileError::Check(e.to_string()))?;
        Ok(existing.as_deref() == Some(desired))
    }

    /// Write `desired` to `path` unless an existing file with different
    /// bytes is already there, in which case this is a digest collision
    /// (§9) and we refuse to overwrite.
    async fn write_guarding_collision(
        &self,
        path: &PathBuf,
        desired: &[u8],
    ) -> Result<(), ReconcileError> {
        let existing = self
            .repo_writer
            .read(path)
            .await
            .map_err(|e| ReconcileError::Enforce(e.to_string()))?;
        match existing {
            Some(bytes) if bytes != desired => Err(ReconcileError::HashCollision { path: path.clone() }),
            Some(_) => Ok(()),
            None => self
                .repo_writer
                .write_atomic(path, desired)
                .await
                .map_err(|e| ReconcileError::Enforce(e.to_string())),
        }
    }
}

#[async_trait]
impl ManagedResource for RepositoryManaged {
    async fn check(&self) -> Result<bool, ReconcileError> {
        if !self.file_matches(&self.repo_path, &self.repo_contents).await? {
            return Ok(false);
        }
        if let (Some(path), Some(contents)) = (&self.gpg_path, &self.gpg_contents) {
            if !self.file_matches(path, contents).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn enforce(&self) -> Result<(), ReconcileError> {
        if let (Some(path), Some(contents)) = (&self.gpg_path, &self.gpg_contents) {
            self.write_guarding_collision(path, contents).await?;
        }
        self.write_guarding_collision(&self.repo_path, &self.repo_contents)
            .await
    }

    fn populate_output(&self) -> Value {
        json!({
            "repo_path": self.repo_path.display().to_string(),
            "gpg_path": self.gpg_path.as_ref().map(|p| p.display().to_string()),
        })
    }

    async fn cleanup(&self) {}
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
