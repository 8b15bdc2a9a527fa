//! insturl - install a gem from a URL
//!
//! This crate provides the library behind the `insturl` command: format
//! detection, fetching, archive extraction, the restricted gemspec reader,
//! the duplicate-installation guard and the install pipeline that ties them
//! together. Building and installing gems is delegated to RubyGems through
//! the traits in [`rubygems`].

pub mod core;
pub mod ops;
pub mod rubygems;
pub mod sources;
pub mod util;

/// Test utilities and mocks for insturl unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides recording mocks for fetching, the package
/// manager and the installed-package registry, plus archive fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    errors::{ErrorKind, InstallError},
    source::{FetchMode, PackageFormat, SourceDescriptor},
    spec::PackageSpec,
    version::Version,
    workspace::Workspace,
};

pub use ops::{InstallOptions, InstallOutcome, Installer};
pub use util::context::GlobalContext;
