//! Filesystem utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Directory under which temporary workspaces are created.
///
/// Never returns a relative path, so a relative `TMPDIR` can't make
/// workspaces appear under the current directory.
pub fn temp_dir_base() -> PathBuf {
    let t = env::temp_dir();
    if t.is_absolute() {
        t
    } else {
        #[cfg(windows)]
        {
            env::var("TEMP")
                .or_else(|_| env::var("TMP"))
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("C:\\Windows\\Temp"))
        }
        #[cfg(not(windows))]
        {
            PathBuf::from("/tmp")
        }
    }
}

/// Top-level contents of a directory, split by kind and sorted by name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirListing {
    pub dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

impl DirListing {
    /// Whether the directory had no entries.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }

    /// File names of all entries, for error messages.
    pub fn names(&self) -> Vec<String> {
        self.dirs
            .iter()
            .chain(&self.files)
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }
}

/// List the immediate children of a directory.
///
/// Symlinks are classified by their target; dangling links are skipped.
pub fn list_dir(path: &Path) -> Result<DirListing> {
    let mut listing = DirListing::default();

    for entry in fs::read_dir(path)
        .with_context(|| format!("failed to read directory: {}", path.display()))?
    {
        let entry = entry?;
        let mut ty = entry.file_type()?;
        if ty.is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(meta) => ty = meta.file_type(),
                Err(_) => continue,
            }
        }
        if ty.is_dir() {
            listing.dirs.push(entry.path());
        } else if ty.is_file() {
            listing.files.push(entry.path());
        }
    }

    listing.dirs.sort();
    listing.files.sort();
    Ok(listing)
}

/// Regular files directly inside `dir` whose name ends with `.{ext}`, sorted.
pub fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let listing = list_dir(dir)?;
    Ok(listing
        .files
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect())
}
