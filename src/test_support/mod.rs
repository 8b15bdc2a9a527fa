//! Test utilities and mocks for insturl unit tests.
//!
//! The mocks stand in for the network and the `gem` tool and record every
//! call, so tests can assert both outcomes and which steps ran.
//!
//! # Example
//!
//! ```rust,ignore
//! use insturl::test_support::{fixtures, MockFetcher, MockPackageManager, StaticInstalledSet};
//!
//! let fetcher = MockFetcher::new()
//!     .with_file("http://example.com/bar.tar.gz", fixtures::tar_gz(&[/* ... */]));
//! let manager = MockPackageManager::new();
//! let installed = StaticInstalledSet::new().with("bar", "0.9");
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::core::spec::PackageSpec;
use crate::core::version::Version;
use crate::rubygems::{InstalledSet, PackageManager};
use crate::sources::fetch::Fetcher;

/// A call made to [`MockFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCall {
    Clone { url: String, dest: PathBuf },
    Download { url: String, dest: PathBuf },
}

/// Fetcher serving canned files and repositories.
///
/// Unknown URLs fail like a 404.
#[derive(Debug, Default)]
pub struct MockFetcher {
    files: HashMap<String, Vec<u8>>,
    repos: HashMap<String, Vec<(String, String)>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl MockFetcher {
    /// Create a fetcher that knows no URLs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` for downloads of `url`.
    pub fn with_file(mut self, url: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(url.to_string(), content.into());
        self
    }

    /// Serve a repository with the given files for clones of `url`.
    pub fn with_repo(mut self, url: &str, files: Vec<(&str, &str)>) -> Self {
        self.repos.insert(
            url.to_string(),
            files
                .into_iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        );
        self
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }

    /// URLs cloned so far.
    pub fn clones(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                FetchCall::Clone { url, .. } => Some(url),
                FetchCall::Download { .. } => None,
            })
            .collect()
    }

    /// URLs downloaded so far.
    pub fn downloads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                FetchCall::Download { url, .. } => Some(url),
                FetchCall::Clone { .. } => None,
            })
            .collect()
    }
}

impl Fetcher for MockFetcher {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(FetchCall::Clone {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        });

        let Some(files) = self.repos.get(url) else {
            bail!("repository not found: {}", url);
        };
        std::fs::create_dir_all(dest)?;
        for (path, content) in files {
            let path = dest.join(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(FetchCall::Download {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        });

        let Some(content) = self.files.get(url) else {
            bail!("HTTP 404 Not Found");
        };
        std::fs::write(dest, content)?;
        Ok(())
    }
}

/// Package manager that records builds and installs.
///
/// `build` writes an empty `<name>-<version>.gem` next to the spec file.
#[derive(Debug, Default)]
pub struct MockPackageManager {
    builds: Mutex<Vec<PathBuf>>,
    installs: Mutex<Vec<PathBuf>>,
    build_error: Option<String>,
    install_error: Option<String>,
}

impl MockPackageManager {
    /// Create a package manager whose operations succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every build fail with `stderr`.
    pub fn failing_build(mut self, stderr: &str) -> Self {
        self.build_error = Some(stderr.to_string());
        self
    }

    /// Make every install fail with `stderr`.
    pub fn failing_install(mut self, stderr: &str) -> Self {
        self.install_error = Some(stderr.to_string());
        self
    }

    /// Spec files built so far.
    pub fn builds(&self) -> Vec<PathBuf> {
        self.builds.lock().unwrap().clone()
    }

    /// Package files installed so far.
    pub fn installs(&self) -> Vec<PathBuf> {
        self.installs.lock().unwrap().clone()
    }

    /// File names of the package files installed so far.
    pub fn installed_file_names(&self) -> Vec<String> {
        self.installs()
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }
}

impl PackageManager for MockPackageManager {
    fn build(&self, spec_file: &Path, spec: &PackageSpec) -> Result<PathBuf> {
        self.builds.lock().unwrap().push(spec_file.to_path_buf());

        if let Some(stderr) = &self.build_error {
            bail!("`gem build` failed with exit code Some(1)\n{}", stderr);
        }

        let dir = spec_file.parent().unwrap_or(Path::new("."));
        let package = dir.join(spec.package_file_name());
        std::fs::write(&package, b"")?;
        Ok(package)
    }

    fn install(&self, package: &Path) -> Result<()> {
        self.installs.lock().unwrap().push(package.to_path_buf());

        if let Some(stderr) = &self.install_error {
            bail!("`gem install` failed with exit code Some(1)\n{}", stderr);
        }
        if !package.is_file() {
            bail!("{} does not exist", package.display());
        }
        Ok(())
    }
}

/// Fixed installed-package registry that records its queries.
#[derive(Debug, Default)]
pub struct StaticInstalledSet {
    installed: Vec<(String, Version)>,
    queries: Mutex<Vec<String>>,
    error: Option<String>,
}

impl StaticInstalledSet {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an installed `(name, version)` pair.
    pub fn with(mut self, name: &str, version: &str) -> Self {
        self.installed
            .push((name.to_string(), version.parse().unwrap()));
        self
    }

    /// Make every query fail.
    pub fn failing(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    /// Names queried so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl InstalledSet for StaticInstalledSet {
    fn installed_versions(&self, name: &str) -> Result<Vec<Version>> {
        self.queries.lock().unwrap().push(name.to_string());

        if let Some(message) = &self.error {
            bail!("{}", message);
        }
        Ok(self
            .installed
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .collect())
    }
}
