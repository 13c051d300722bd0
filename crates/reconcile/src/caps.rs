// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `HostCaps`: the bundle of injected capabilities a resource kind's
//! `validate`/`check`/`enforce` depends on. OS detection happens once at
//! startup and picks the concrete backend behind each capability (§9
//! "Capability abstraction over OS-specific code") — no resource kind ever
//! branches on OS itself.

use std::sync::Arc;

use fleet_adapters::{AccountManager, PackageManager, RepoWriter, ScriptRunner};

#[derive(Clone)]
pub struct HostCaps {
    pub package_manager: Arc<dyn PackageManager>,
    pub repo_writer: Arc<dyn RepoWriter>,
    pub script_runner: Arc<dyn ScriptRunner>,
    pub account_manager: Arc<dyn AccountManager>,
    pub http_client: reqwest::Client,
    /// 1 MiB cap on GPG keyring and `FileResource` URL fetches (§4.5).
    pub max_fetch_bytes: u64,
}
