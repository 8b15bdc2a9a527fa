use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::spec::PackageSpec;
use crate::core::version::Version;
use crate::rubygems::{InstalledSet, PackageManager};
use crate::util::config::ToolsConfig;
use crate::util::process::{find_executable, ProcessBuilder};

/// Environment variable naming the `gem` executable.
pub const GEM_ENV: &str = "GEM";

/// Drives the `gem` command line tool.
#[derive(Debug, Clone)]
pub struct GemCommand {
    program: PathBuf,
}

impl GemCommand {
    /// Use a specific `gem` executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        GemCommand {
            program: program.into(),
        }
    }

    /// Locate `gem`: config first, then `$GEM`, then `PATH`.
    ///
    /// Falls back to the bare name so a missing tool is reported when it is
    /// first run rather than up front.
    pub fn from_config(tools: &ToolsConfig) -> Self {
        let program = tools
            .gem
            .clone()
            .or_else(|| {
                std::env::var_os(GEM_ENV)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .or_else(|| find_executable("gem"))
            .unwrap_or_else(|| PathBuf::from("gem"));

        tracing::debug!("Using gem executable {}", program.display());
        GemCommand::new(program)
    }

    /// Get the executable path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.program)
    }
}

impl PackageManager for GemCommand {
    fn build(&self, spec_file: &Path, spec: &PackageSpec) -> Result<PathBuf> {
        let dir = spec_file
            .parent()
            .with_context(|| format!("{} has no parent directory", spec_file.display()))?;
        let file_name = spec_file
            .file_name()
            .with_context(|| format!("{} has no file name", spec_file.display()))?;

        let output = self
            .command()
            .arg("build")
            .arg(file_name)
            .cwd(dir)
            .exec_and_check()?;
        tracing::debug!("{}", String::from_utf8_lossy(&output.stdout).trim_end());

        let package = dir.join(spec.package_file_name());
        if !package.is_file() {
            bail!(
                "`gem build` did not produce {} in {}",
                spec.package_file_name(),
                dir.display()
            );
        }
        Ok(package)
    }

    fn install(&self, package: &Path) -> Result<()> {
        let mut cmd = self.command().arg("install").arg("--local").arg(package);
        if let Some(dir) = package.parent() {
            cmd = cmd.cwd(dir);
        }

        let output = cmd.exec_and_check()?;
        tracing::debug!("{}", String::from_utf8_lossy(&output.stdout).trim_end());
        Ok(())
    }
}

impl InstalledSet for GemCommand {
    fn installed_versions(&self, name: &str) -> Result<Vec<Version>> {
        let output = self
            .command()
            .args(["list", "--local", "--exact", "--all", name])
            .exec_and_check()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_gem_list(&stdout, name))
    }
}

/// Parse `gem list` output into the versions installed for `name`.
///
/// Lines look like `foo (1.2.0 x86_64-linux, default: 1.0.0, 0.9)`. Header
/// lines, other gems and versions that do not parse are skipped.
pub fn parse_gem_list(output: &str, name: &str) -> Vec<Version> {
    let mut versions = Vec::new();

    for line in output.lines() {
        let Some((gem, rest)) = line.trim().split_once(" (") else {
            continue;
        };
        if gem != name {
            continue;
        }
        let list = rest.strip_suffix(')').unwrap_or(rest);

        for item in list.split(',') {
            let item = item.trim();
            let item = item.strip_prefix("default:").unwrap_or(item).trim();
            let Some(raw) = item.split_whitespace().next() else {
                continue;
            };
            match raw.parse::<Version>() {
                Ok(version) => versions.push(version),
                Err(e) => tracing::debug!("Ignoring `{}` in gem list output: {}", raw, e),
            }
        }
    }

    versions
}
