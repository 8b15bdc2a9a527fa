//! Error types for the install pipeline.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Every way an `insturl` invocation can fail.
///
/// All variants are fatal for the current invocation. Each one carries the
/// detail needed to identify what failed (URL, path, name/version).
#[derive(Debug, Error, miette::Diagnostic)]
pub enum InstallError {
    #[error("URL is missing")]
    #[diagnostic(
        code(insturl::missing_url),
        help("pass the location of a .gem, .tar.gz, .zip or git repository")
    )]
    MissingUrl,

    #[error("unsupported package format: {url}")]
    #[diagnostic(
        code(insturl::unsupported_format),
        help("supported suffixes are .gem, .tar.gz, .tgz, .zip and .git; pass --git for repositories without a .git suffix")
    )]
    UnsupportedFormat { url: String },

    #[error("failed to create a temporary workspace")]
    #[diagnostic(code(insturl::workspace))]
    Workspace {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {url}")]
    #[diagnostic(
        code(insturl::fetch_failed),
        help("check the URL and your network connection")
    )]
    FetchFailed {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to extract {}: {message}", .path.display())]
    #[diagnostic(code(insturl::extract_failed))]
    ExtractFailed { path: PathBuf, message: String },

    #[error("gemspec not found in {}", .dir.display())]
    #[diagnostic(
        code(insturl::spec_not_found),
        help("the package must have a *.gemspec file in its top level directory")
    )]
    SpecNotFound { dir: PathBuf },

    #[error("multiple gemspecs found in {}: {}", .dir.display(), .candidates.join(", "))]
    #[diagnostic(code(insturl::ambiguous_spec))]
    AmbiguousSpec { dir: PathBuf, candidates: Vec<String> },

    #[error("failed to load {}: {message}", .path.display())]
    #[diagnostic(code(insturl::spec_parse))]
    SpecParse { path: PathBuf, message: String },

    #[error("failed to query installed versions of `{name}`")]
    #[diagnostic(code(insturl::registry_query))]
    RegistryQuery {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{name} {version} has already been installed")]
    #[diagnostic(
        code(insturl::already_installed),
        help("pass --override to install {name} {version} again")
    )]
    AlreadyInstalled { name: String, version: String },

    #[error("failed to build a gem from {}", .spec.display())]
    #[diagnostic(code(insturl::build_failed))]
    BuildFailed {
        spec: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to install {}", .package.display())]
    #[diagnostic(code(insturl::install_failed))]
    InstallFailed {
        package: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Discriminant of [`InstallError`], for callers that branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingUrl,
    UnsupportedFormat,
    Workspace,
    FetchFailed,
    ExtractFailed,
    SpecNotFound,
    AmbiguousSpec,
    SpecParse,
    RegistryQuery,
    AlreadyInstalled,
    BuildFailed,
    InstallFailed,
}

impl InstallError {
    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InstallError::MissingUrl => ErrorKind::MissingUrl,
            InstallError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            InstallError::Workspace { .. } => ErrorKind::Workspace,
            InstallError::FetchFailed { .. } => ErrorKind::FetchFailed,
            InstallError::ExtractFailed { .. } => ErrorKind::ExtractFailed,
            InstallError::SpecNotFound { .. } => ErrorKind::SpecNotFound,
            InstallError::AmbiguousSpec { .. } => ErrorKind::AmbiguousSpec,
            InstallError::SpecParse { .. } => ErrorKind::SpecParse,
            InstallError::RegistryQuery { .. } => ErrorKind::RegistryQuery,
            InstallError::AlreadyInstalled { .. } => ErrorKind::AlreadyInstalled,
            InstallError::BuildFailed { .. } => ErrorKind::BuildFailed,
            InstallError::InstallFailed { .. } => ErrorKind::InstallFailed,
        }
    }

    /// Rewrite paths under `root` as paths relative to it.
    ///
    /// Used for paths inside the workspace, which is gone by the time the
    /// error is shown.
    pub fn relative_to(self, root: &Path) -> Self {
        let rel = |path: PathBuf| match path.strip_prefix(root) {
            Ok(p) if p.as_os_str().is_empty() => PathBuf::from("."),
            Ok(p) => p.to_path_buf(),
            Err(_) => path,
        };

        match self {
            InstallError::ExtractFailed { path, message } => InstallError::ExtractFailed {
                path: rel(path),
                message,
            },
            InstallError::SpecNotFound { dir } => InstallError::SpecNotFound { dir: rel(dir) },
            InstallError::AmbiguousSpec { dir, candidates } => InstallError::AmbiguousSpec {
                dir: rel(dir),
                candidates,
            },
            InstallError::SpecParse { path, message } => InstallError::SpecParse {
                path: rel(path),
                message,
            },
            InstallError::BuildFailed { spec, source } => InstallError::BuildFailed {
                spec: rel(spec),
                source,
            },
            InstallError::InstallFailed { package, source } => InstallError::InstallFailed {
                package: rel(package),
                source,
            },
            other => other,
        }
    }
}
