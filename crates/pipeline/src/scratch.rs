//! Cleanup of intermediate files.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tracks intermediate files and removes them when dropped, on success
/// and on early return alike.
#[derive(Debug, Default)]
pub struct Scratch {
    paths: Vec<PathBuf>,
    keep: bool,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A guard that records paths but never deletes them
    pub fn keeping() -> Self {
        Self {
            paths: Vec::new(),
            keep: true,
        }
    }

    /// Register `path` for removal and hand it back.
    pub fn track(&mut self, path: PathBuf) -> PathBuf {
        self.paths.push(path.clone());
        path
    }

    /// Stop tracking `path`; it survives the guard.
    pub fn release(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("cannot remove {}: {}", path.display(), e),
            }
        }
    }
}
