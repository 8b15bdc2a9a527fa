//! Implementation of `insturl install`.
//!
//! The pipeline runs strictly in order:
//!
//! ```text
//! Start -> FormatDetected -> Fetched -> Extracted -> SpecLoaded -> GuardPassed -> Built -> Installed
//! ```
//!
//! A `.gem` skips `Built`. Any failure aborts the run; the workspace is
//! removed whichever way it ends.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::errors::InstallError;
use crate::core::source::{detect_format, FetchMode, PackageFormat, SourceDescriptor};
use crate::core::spec::PackageSpec;
use crate::core::workspace::Workspace;
use crate::ops::guard::check_not_installed;
use crate::ops::locate::locate_spec;
use crate::rubygems::{InstalledSet, PackageManager};
use crate::sources::extract::{extract, InstallTarget};
use crate::sources::fetch::{fetch, Fetcher};
use crate::sources::gem::read_gem_spec;
use crate::util::shell::{Shell, Status};

/// Options for the install command.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Install even if the same version is already installed
    pub override_existing: bool,

    /// Clone the URL as a git repository regardless of its name
    pub use_repository_mode: bool,

    /// Parent directory for the workspace (None = system temp dir)
    pub workspace_root: Option<PathBuf>,
}

/// Pipeline stage reached by an install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    FormatDetected,
    Fetched,
    Extracted,
    SpecLoaded,
    GuardPassed,
    Built,
    Installed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::FormatDetected => "format detected",
            Stage::Fetched => "fetched",
            Stage::Extracted => "extracted",
            Stage::SpecLoaded => "spec loaded",
            Stage::GuardPassed => "guard passed",
            Stage::Built => "built",
            Stage::Installed => "installed",
        };
        f.write_str(name)
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// What was installed
    pub spec: PackageSpec,

    /// Format the URL was handled as
    pub format: PackageFormat,

    /// Installed package file, relative to the (now removed) workspace
    pub package_file: PathBuf,
}

/// Runs the install pipeline against pluggable fetch and package backends.
pub struct Installer<'a> {
    fetcher: &'a dyn Fetcher,
    manager: &'a dyn PackageManager,
    installed: &'a dyn InstalledSet,
    options: InstallOptions,
    shell: Option<Arc<Shell>>,
}

impl<'a> Installer<'a> {
    /// Create an installer.
    pub fn new(
        fetcher: &'a dyn Fetcher,
        manager: &'a dyn PackageManager,
        installed: &'a dyn InstalledSet,
        options: InstallOptions,
    ) -> Self {
        Installer {
            fetcher,
            manager,
            installed,
            options,
            shell: None,
        }
    }

    /// Report progress through `shell`.
    pub fn with_shell(mut self, shell: Arc<Shell>) -> Self {
        self.shell = Some(shell);
        self
    }

    /// Install the package at `url`.
    pub fn install(&self, url: &str) -> Result<InstallOutcome, InstallError> {
        let mut stage = StageTracker::new();

        let url = url.trim();
        if url.is_empty() {
            return Err(stage.abort(InstallError::MissingUrl));
        }

        let mode = if self.options.use_repository_mode {
            FetchMode::GitClone
        } else {
            FetchMode::Auto
        };
        let source = SourceDescriptor::new(url, mode);
        let format = detect_format(&source).map_err(|e| stage.abort(e))?;
        stage.advance(Stage::FormatDetected);
        tracing::debug!("{} is a {}", url, format);

        let workspace = match &self.options.workspace_root {
            Some(root) => Workspace::new_in(root),
            None => Workspace::new(),
        }
        .map_err(|source| stage.abort(InstallError::Workspace { source }))?;

        let result = self.run(&source, format, &workspace, &mut stage);

        let workspace_path = workspace.path().to_path_buf();
        if let Err(e) = workspace.close() {
            tracing::warn!(
                "Failed to remove workspace {}: {}",
                workspace_path.display(),
                e
            );
            if let Some(shell) = &self.shell {
                shell.warn(format!("could not remove {}: {}", workspace_path.display(), e));
            }
        }

        result.map_err(|e| stage.abort(e.relative_to(&workspace_path)))
    }

    fn run(
        &self,
        source: &SourceDescriptor,
        format: PackageFormat,
        workspace: &Workspace,
        stage: &mut StageTracker,
    ) -> Result<InstallOutcome, InstallError> {
        self.status(Status::Fetching, source.url());
        let artifact = fetch(self.fetcher, source, format, workspace.path())?;
        stage.advance(Stage::Fetched);

        if format.is_archive() {
            self.status(Status::Unpacking, file_name(&artifact.path));
        }
        let target = extract(&artifact, format, workspace.path())?;
        stage.advance(Stage::Extracted);

        let (spec, package) = match target {
            InstallTarget::GemFile(package) => {
                let spec = read_gem_spec(&package).map_err(|e| InstallError::SpecParse {
                    path: package.clone(),
                    message: format!("{:#}", e),
                })?;
                stage.advance(Stage::SpecLoaded);

                self.guard(&spec)?;
                stage.advance(Stage::GuardPassed);

                (spec, package)
            }
            InstallTarget::SourceDir(dir) => {
                let located = locate_spec(&dir)?;
                stage.advance(Stage::SpecLoaded);

                self.guard(&located.spec)?;
                stage.advance(Stage::GuardPassed);

                self.status(Status::Building, &located.spec);
                let package = self
                    .manager
                    .build(&located.path, &located.spec)
                    .map_err(|source| InstallError::BuildFailed {
                        spec: located.path.clone(),
                        source,
                    })?;
                stage.advance(Stage::Built);

                (located.spec, package)
            }
        };

        self.status(Status::Installing, file_name(&package));
        self.manager
            .install(&package)
            .map_err(|source| InstallError::InstallFailed {
                package: package.clone(),
                source,
            })?;
        stage.advance(Stage::Installed);
        self.status(Status::Installed, &spec);

        let package_file = package
            .strip_prefix(workspace.path())
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(file_name(&package)));

        Ok(InstallOutcome {
            spec,
            format,
            package_file,
        })
    }

    fn guard(&self, spec: &PackageSpec) -> Result<(), InstallError> {
        if self.options.override_existing {
            self.status(Status::Skipped, format!("installed check for {}", spec));
        }
        check_not_installed(spec, self.installed, self.options.override_existing)
    }

    fn status(&self, status: Status, msg: impl fmt::Display) {
        if let Some(shell) = &self.shell {
            shell.status(status, msg);
        }
    }
}

/// Current stage of one run, logged on every transition.
#[derive(Debug)]
struct StageTracker {
    current: Stage,
}

impl StageTracker {
    fn new() -> Self {
        StageTracker {
            current: Stage::Start,
        }
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!("stage: {} -> {}", self.current, next);
        self.current = next;
    }

    fn abort(&self, err: InstallError) -> InstallError {
        tracing::debug!("stage: {} -> aborted ({:?})", self.current, err.kind());
        err
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
