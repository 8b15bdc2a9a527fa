//! Workspace - the private scratch directory of one install.
//!
//! A Workspace is created once the URL has been validated and its format
//! detected, and is removed when it goes out of scope. Everything fetched,
//! unpacked or built during an install lives inside it, so nothing outlives
//! the invocation regardless of how the pipeline ends.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::util::fs::temp_dir_base;

/// Prefix of workspace directory names.
const WORKSPACE_PREFIX: &str = "insturl-";

/// A scoped temporary directory, recursively removed on drop.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    /// Create a workspace under the system temporary directory.
    pub fn new() -> io::Result<Self> {
        Self::new_in(&temp_dir_base())
    }

    /// Create a workspace under a specific parent directory.
    pub fn new_in(parent: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)?;
        let path = dir.path().to_path_buf();

        tracing::debug!("Created workspace {}", path.display());

        Ok(Workspace {
            path,
            dir: Some(dir),
        })
    }

    /// Get the workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Join a relative path onto the workspace directory.
    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.path.join(rel)
    }

    /// Remove the workspace now, reporting any failure.
    pub fn close(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => {
                tracing::debug!("Removing workspace {}", self.path.display());
                dir.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                tracing::warn!(
                    "Failed to remove workspace {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}
