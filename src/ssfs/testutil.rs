//! Shared helpers for this crate's own tests. Not part of the public API.

#![cfg(test)]

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Returns a fresh path under the system temp directory, unique for this
/// process, so tests never collide with each other or with a previous run.
pub(crate) fn temp_path(name: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    env::temp_dir().join(format!("ssfs_test_{}_{}_{}.img", std::process::id(), n, name))
}
