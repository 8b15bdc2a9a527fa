//! The package manager boundary.
//!
//! Building, installing and listing gems is delegated to RubyGems. The core
//! pipeline only sees these two traits; [`GemCommand`] implements both by
//! running the `gem` executable.

mod gem_command;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::spec::PackageSpec;
use crate::core::version::Version;

pub use gem_command::{parse_gem_list, GemCommand};

/// Builds and installs package files.
pub trait PackageManager {
    /// Build a package from `spec_file`, returning the path of the produced
    /// `<name>-<version>.gem` next to it.
    fn build(&self, spec_file: &Path, spec: &PackageSpec) -> Result<PathBuf>;

    /// Install a package file.
    fn install(&self, package: &Path) -> Result<()>;
}

/// Read-only view of the installed packages.
pub trait InstalledSet {
    /// All installed versions of the package called `name`.
    fn installed_versions(&self, name: &str) -> Result<Vec<Version>>;
}
