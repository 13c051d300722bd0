// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn write_atomic_creates_parent_dirs_and_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/deeper/repo.list");
    let writer = FsRepoWriter;

    writer.write_atomic(&path, b"hello world").await.unwrap();

    let read_back = writer.read(&path).await.unwrap().unwrap();
    assert_eq!(read_back, b"hello world");
}

#[tokio::test]
async fn write_atomic_overwrites_without_leaving_a_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repo.list");
    let writer = FsRepoWriter;

    writer.write_atomic(&path, b"first").await.unwrap();
    writer.write_atomic(&path, b"second").await.unwrap();

    let read_back = writer.read(&path).await.unwrap().unwrap();
    assert_eq!(read_back, b"second");

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries.len(), 1, "temp file was not cleaned up: {entries:?}");
}

#[tokio::test]
async fn read_missing_file_is_none_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let writer = FsRepoWriter;
    let result = writer.read(&dir.path().join("missing")).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn remove_missing_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let writer = FsRepoWriter;
    writer.remove(&dir.path().join("missing")).await.unwrap();
}

#[tokio::test]
async fn fake_repo_writer_round_trips() {
    let writer = FakeRepoWriter::new();
    let path = PathBuf::from("/etc/apt/sources.list.d/osconfig_added_abc.list");
    writer.write_atomic(&path, b"deb http://x stable main").await.unwrap();
    assert_eq!(writer.contents(&path), Some(b"deb http://x stable main".to_vec()));
    writer.remove(&path).await.unwrap();
    assert_eq!(writer.contents(&path), None);
}
