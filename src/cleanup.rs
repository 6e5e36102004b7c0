//! Removal of temporary artifacts, both on interruption and at the end of a run.

use log::debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::runtime::Runtime;

/// Tracks paths that need cleanup on interruption
#[derive(Default)]
pub struct CleanupContext {
    #[cfg(test)]
    pub paths: Vec<PathBuf>,
    #[cfg(not(test))]
    paths: Vec<PathBuf>,
}

impl CleanupContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    pub fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    /// Clean up all registered paths
    pub fn cleanup(&self) {
        for path in &self.paths {
            debug!("Cleaning up: {:?}", path);
            if path.is_dir() {
                let _ = std::fs::remove_dir_all(path);
            } else {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

pub type SharedCleanupContext = Arc<Mutex<CleanupContext>>;

pub fn new_shared() -> SharedCleanupContext {
    Arc::new(Mutex::new(CleanupContext::new()))
}

/// Registers a path for interruption cleanup until `success` is called.
pub struct CleanupGuard {
    ctx: SharedCleanupContext,
    path: PathBuf,
}

impl CleanupGuard {
    pub fn new(ctx: SharedCleanupContext, path: PathBuf) -> Self {
        ctx.lock().unwrap().add(path.clone());
        Self { ctx, path }
    }

    pub fn success(self) {
        self.ctx.lock().unwrap().remove(&self.path);
    }
}

/// Removes each directory, treating absence or failure as nothing to clean.
/// Returns the directories that were actually removed.
#[tracing::instrument(skip(runtime))]
pub fn remove_dirs<R: Runtime>(runtime: &R, dirs: &[&Path]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for dir in dirs {
        if !runtime.exists(dir) {
            debug!("Nothing to clean at {:?}", dir);
            continue;
        }
        match runtime.remove_dir_all(dir) {
            Ok(()) => removed.push(dir.to_path_buf()),
            Err(e) => debug!("Ignoring cleanup failure for {:?}: {}", dir, e),
        }
    }
    removed
}
