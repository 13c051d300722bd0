// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `SingletonLock` (§4.8): an OS-level advisory file lock ensuring at most
//! one agent process runs per host. Released on every exit path, including
//! fatal-log paths, by virtue of being an RAII guard dropped at the end of
//! `main` (or earlier, on a fatal-error branch).

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SingletonLockError {
    #[error("another agent process holds the lock at {path}")]
    Contended { path: PathBuf },
    #[error("io error opening lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Holds an exclusive advisory lock on `path` for as long as it is alive.
/// The lock is released when this value is dropped (process exit, fatal-log
/// branch, or explicit `drop`) — see §4.8 and the "Singleton-lock +
/// deferred-cleanup ordering" design note (§9).
pub struct SingletonLock {
    file: File,
    path: PathBuf,
}

impl SingletonLock {
    /// Create the lock file (and its parent directory) if missing, and take
    /// an exclusive non-blocking lock on it. Contention is a startup refusal,
    /// never a wait (§4.8 "On contention, refuses to start").
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, SingletonLockError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SingletonLockError::Io {
                path: path.clone(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .map_err(|source| SingletonLockError::Io {
                path: path.clone(),
                source,
            })?;

        file.try_lock_exclusive()
            .map_err(|_| SingletonLockError::Contended { path: path.clone() })?;

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SingletonLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "singleton lock: failed to release");
        }
    }
}

#[cfg(test)]
#[path = "singleton_lock_tests.rs"]
mod tests;
