//! Archive extraction.
//!
//! Turns a fetched artifact into something installable: a `.gem` file that
//! goes straight to the package manager, or a source directory that contains
//! a gemspec.

use std::fs::File;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

use crate::core::errors::InstallError;
use crate::core::source::PackageFormat;
use crate::sources::fetch::{ArtifactKind, FetchedArtifact};
use crate::util::fs::list_dir;

/// Name of the directory archives are unpacked into.
pub const UNPACK_DIR: &str = "unpacked";

/// What the install step works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallTarget {
    /// A package file ready to install.
    GemFile(PathBuf),
    /// A directory holding a gemspec to build from.
    SourceDir(PathBuf),
}

impl InstallTarget {
    pub fn path(&self) -> &Path {
        match self {
            InstallTarget::GemFile(path) | InstallTarget::SourceDir(path) => path,
        }
    }
}

/// Prepare the fetched artifact for installation.
pub fn extract(
    artifact: &FetchedArtifact,
    format: PackageFormat,
    workspace_dir: &Path,
) -> Result<InstallTarget, InstallError> {
    let failed = |message: String| InstallError::ExtractFailed {
        path: artifact.path.clone(),
        message,
    };

    match format {
        PackageFormat::GemFile => {
            if artifact.kind != ArtifactKind::File || !artifact.path.is_file() {
                return Err(failed("fetched gem is not a file".to_string()));
            }
            Ok(InstallTarget::GemFile(artifact.path.clone()))
        }
        PackageFormat::Git => {
            if artifact.kind != ArtifactKind::Directory || !artifact.path.is_dir() {
                return Err(failed("cloned repository is not a directory".to_string()));
            }
            Ok(InstallTarget::SourceDir(artifact.path.clone()))
        }
        PackageFormat::TarGz | PackageFormat::Zip => {
            let dest = workspace_dir.join(UNPACK_DIR);
            std::fs::create_dir_all(&dest)
                .with_context(|| format!("failed to create directory: {}", dest.display()))
                .map_err(|e| failed(format!("{:#}", e)))?;

            let unpacked = if format == PackageFormat::TarGz {
                unpack_tar_gz(&artifact.path, &dest)
            } else {
                unpack_zip(&artifact.path, &dest)
            };
            unpacked.map_err(|e| failed(format!("{:#}", e)))?;

            let expected = artifact
                .path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| format.strip_suffix(name))
                .map(str::to_string);

            select_source_dir(&dest, expected.as_deref())
                .map(InstallTarget::SourceDir)
                .map_err(|e| failed(format!("{:#}", e)))
        }
    }
}

/// Unpack a gzip-compressed tarball into `dest`.
///
/// Entries with absolute paths or `..` components are rejected before
/// anything is written for them.
pub fn unpack_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();

        if !is_contained(&entry_path) {
            bail!(
                "tarball entry escapes destination directory: {}",
                entry_path.display()
            );
        }

        let unpacked = entry
            .unpack_in(dest)
            .with_context(|| format!("failed to unpack {}", entry_path.display()))?;
        if !unpacked {
            bail!(
                "tarball entry escapes destination directory: {}",
                entry_path.display()
            );
        }
    }

    Ok(())
}

/// Unpack a zip archive into `dest`.
pub fn unpack_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open {}", archive_path.display()))?;
    let mut zip = zip::ZipArchive::new(file).context("failed to read zip archive")?;

    for i in 0..zip.len() {
        let entry = zip.by_index(i).context("failed to read zip entry")?;
        if entry.enclosed_name().is_none() {
            bail!("zip entry escapes destination directory: {}", entry.name());
        }
    }

    zip.extract(dest).context("failed to extract zip archive")?;
    Ok(())
}

fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Pick the directory holding the package sources inside `unpacked`.
///
/// Tried in order: the directory named like the archive, the only top-level
/// directory, the unpack directory itself when files sit at its top level.
pub fn select_source_dir(unpacked: &Path, expected: Option<&str>) -> Result<PathBuf> {
    if let Some(name) = expected {
        let candidate = unpacked.join(name);
        if candidate.is_dir() {
            return Ok(candidate);
        }
    }

    let listing = list_dir(unpacked)?;

    if listing.files.is_empty() && listing.dirs.len() == 1 {
        let dir = listing.dirs[0].clone();
        tracing::debug!(
            "Archive top-level directory {} does not match {:?}, using it anyway",
            dir.display(),
            expected
        );
        return Ok(dir);
    }

    if !listing.files.is_empty() {
        tracing::debug!("Archive has no top-level directory, using {}", unpacked.display());
        return Ok(unpacked.to_path_buf());
    }

    match expected {
        Some(name) => bail!(
            "expected directory `{}` not found (archive contains: {})",
            name,
            contents_summary(&listing.names())
        ),
        None => bail!(
            "cannot determine the package directory (archive contains: {})",
            contents_summary(&listing.names())
        ),
    }
}

fn contents_summary(names: &[String]) -> String {
    if names.is_empty() {
        "nothing".to_string()
    } else {
        names.join(", ")
    }
}
