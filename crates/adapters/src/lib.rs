// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: capability traits the reconciler and agent
//! loop depend on, one production backend per capability, and `Traced*`
//! logging wrappers.

pub mod account_manager;
pub mod env;
pub mod gpg;
pub mod metadata_client;
pub mod package_manager;
pub mod repo_writer;
pub mod rpc;
pub mod script_runner;
pub mod singleton_lock;
pub mod subprocess;
pub mod traced;

pub use account_manager::{AccountManager, AccountManagerError, NoopAccountManager};
pub use gpg::{fetch_and_serialize_keyring, serialize_keyring, GpgError};
pub use metadata_client::{HttpMetadataClient, MetadataClient, MetadataClientError};
pub use package_manager::{AptPackageManager, PackageManager, PackageManagerError};
pub use repo_writer::{FsRepoWriter, RepoWriter, RepoWriterError};
pub use rpc::{
    RpcError, TaskStreamReader, TaskStreamWriter, TcpRpcClient, RPCClient,
};
pub use script_runner::{ScriptRunner, ScriptRunnerError, SubprocessScriptRunner, DEFAULT_EXEC_TIMEOUT};
pub use singleton_lock::{SingletonLock, SingletonLockError};
pub use traced::{
    TracedMetadataClient, TracedPackageManager, TracedRepoWriter, TracedRpcClient,
    TracedScriptRunner,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use metadata_client::FakeMetadataClient;
#[cfg(any(test, feature = "test-support"))]
pub use package_manager::{FakeCall, FakePackageManager};
#[cfg(any(test, feature = "test-support"))]
pub use repo_writer::FakeRepoWriter;
#[cfg(any(test, feature = "test-support"))]
pub use rpc::{FakeRPCClient, RecordedSend};
#[cfg(any(test, feature = "test-support"))]
pub use script_runner::FakeScriptRunner;
