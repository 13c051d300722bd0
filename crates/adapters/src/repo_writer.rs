// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RepoWriter` capability backing `RepositoryResource`: atomic filesystem
//! writes for repo files and GPG trust-store entries.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum RepoWriterError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepoWriterError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Atomic file write/read/remove over a managed path, used for both repo
/// definition files and the apt trusted-keyring files.
#[async_trait]
pub trait RepoWriter: Send + Sync {
    /// `mkdir -p` the parent directory, then write via temp file + rename.
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), RepoWriterError>;

    /// `None` if the path does not exist.
    async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, RepoWriterError>;

    async fn remove(&self, path: &Path) -> Result<(), RepoWriterError>;
}

#[async_trait]
impl<T: RepoWriter + ?Sized> RepoWriter for std::sync::Arc<T> {
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), RepoWriterError> {
        (**self).write_atomic(path, contents).await
    }

    async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, RepoWriterError> {
        (**self).read(path).await
    }

    async fn remove(&self, path: &Path) -> Result<(), RepoWriterError> {
        (**self).remove(path).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsRepoWriter;

#[async_trait]
impl RepoWriter for FsRepoWriter {
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), RepoWriterError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepoWriterError::io(parent, e))?;
        }
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let tmp_path = parent.join(format!(".{file_name}.tmp-{}", std::process::id()));

        let mut tmp = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| RepoWriterError::io(&tmp_path, e))?;
        tmp.write_all(contents)
            .await
            .map_err(|e| RepoWriterError::io(&tmp_path, e))?;
        tmp.flush()
            .await
            .map_err(|e| RepoWriterError::io(&tmp_path, e))?;
        drop(tmp);

        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| RepoWriterError::io(path, e))?;
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, RepoWriterError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RepoWriterError::io(path, e)),
        }
    }

    async fn remove(&self, path: &Path) -> Result<(), RepoWriterError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RepoWriterError::io(path, e)),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRepoWriter;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// In-memory `RepoWriter` for reconciler unit tests that don't need a
    /// real filesystem.
    #[derive(Default)]
    pub struct FakeRepoWriter {
        files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    }

    impl FakeRepoWriter {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
            self.files.lock().get(path).cloned()
        }
    }

    #[async_trait]
    impl RepoWriter for FakeRepoWriter {
        async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), RepoWriterError> {
            self.files
                .lock()
                .insert(path.to_path_buf(), contents.to_vec());
            Ok(())
        }

        async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, RepoWriterError> {
            Ok(self.files.lock().get(path).cloned())
        }

        async fn remove(&self, path: &Path) -> Result<(), RepoWriterError> {
            self.files.lock().remove(path);
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "repo_writer_tests.rs"]
mod tests;
