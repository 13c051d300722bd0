// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-lifecycle primitives shared by `main` and `ServiceLoop`: the
//! LIFO deferred-cleanup stack (§9 "Singleton-lock + deferred-cleanup
//! ordering") and the exit-code decision between a signal-driven shutdown
//! (0) and a restart-marker shutdown (2).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// LIFO stack of cleanup closures run in full on every exit path, including
/// fatal-log branches. Registration order is push order; run order is the
/// reverse, matching "Deferred cleanups form a LIFO stack" (§9).
#[derive(Clone, Default)]
pub struct DeferredCleanup {
    stack: Arc<Mutex<Vec<Box<dyn FnOnce() + Send>>>>,
}

impl DeferredCleanup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, cleanup: impl FnOnce() + Send + 'static) {
        self.stack.lock().push(Box::new(cleanup));
    }

    /// Run every registered cleanup, most-recently-registered first. Never
    /// split across tasks (§9): this runs entirely on the calling task.
    pub fn run_all(&self) {
        let mut stack = self.stack.lock();
        while let Some(cleanup) = stack.pop() {
            cleanup();
        }
    }
}

/// Tracks whether the current shutdown was requested by the restart-marker
/// watcher, so the caller can choose exit code 2 instead of the normal 0
/// (§4.6, §6 "Exit codes").
#[derive(Clone, Default)]
pub struct ShutdownState {
    restart_requested: Arc<AtomicBool>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.restart_requested)
    }

    pub fn exit_code(&self) -> i32 {
        if self.restart_requested.load(Ordering::SeqCst) {
            2
        } else {
            0
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
