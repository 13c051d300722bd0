// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the reconciler (§7): per-resource failures never
//! propagate past the resource boundary — [`crate::reconciler::apply_policy`]
//! converts every `Err` here into a `ComplianceReport` with
//! `state = ERROR` and `cause = error.to_string()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("unsupported resource kind: {0}")]
    UnsupportedKind(String),
    #[error("validate failed: {0}")]
    Validate(String),
    #[error("check failed: {0}")]
    Check(String),
    #[error("enforce failed: {0}")]
    Enforce(String),
    /// §9 "repo-file hash collision" open question, resolved: the target
    /// path is derived purely from `sha256(contents)`, so an existing file
    /// at that path with *different* bytes can only mean two distinct specs
    /// collided on the same 10-hex-char digest prefix. Never silently
    /// overwritten.
    #[error("hash collision at {path}: an existing file's contents do not match what its own path-digest implies")]
    HashCollision { path: PathBuf },
    #[error("fetch failed: {0}")]
    Fetch(String),
}
