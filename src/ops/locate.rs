//! Finding and loading the gemspec of a source directory.

use std::path::{Path, PathBuf};

use crate::core::errors::InstallError;
use crate::core::gemspec::read_gemspec;
use crate::core::spec::PackageSpec;
use crate::util::fs::files_with_extension;

/// Extension of specification files.
pub const GEMSPEC_EXTENSION: &str = "gemspec";

/// The one gemspec of a directory, with what it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSpec {
    pub path: PathBuf,
    pub spec: PackageSpec,
}

/// Find exactly one `*.gemspec` directly inside `dir` and read it.
///
/// Several candidates are an error; one is never picked over another.
pub fn locate_spec(dir: &Path) -> Result<LocatedSpec, InstallError> {
    let candidates =
        files_with_extension(dir, GEMSPEC_EXTENSION).map_err(|_| InstallError::SpecNotFound {
            dir: dir.to_path_buf(),
        })?;

    let path = match candidates.as_slice() {
        [] => {
            return Err(InstallError::SpecNotFound {
                dir: dir.to_path_buf(),
            })
        }
        [one] => one.clone(),
        many => {
            return Err(InstallError::AmbiguousSpec {
                dir: dir.to_path_buf(),
                candidates: many
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect(),
            })
        }
    };

    tracing::debug!("Reading {}", path.display());
    let spec = read_gemspec(&path).map_err(|e| InstallError::SpecParse {
        path: path.clone(),
        message: e.to_string(),
    })?;

    Ok(LocatedSpec { path, spec })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use crate::test_support::fixtures;
    use tempfile::TempDir;

    #[test]
    fn test_single_spec() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("foo.gemspec"),
            fixtures::gemspec_source("foo", "1.0"),
        )
        .unwrap();
        std::fs::write(tmp.path().join("Rakefile"), "").unwrap();

        let located = locate_spec(tmp.path()).unwrap();
        assert_eq!(located.path, tmp.path().join("foo.gemspec"));
        assert_eq!(located.spec.to_string(), "foo 1.0");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_spec() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("spec")).unwrap();
        std::fs::write(
            tmp.path().join("spec/foo.gemspec"),
            fixtures::gemspec_source("foo", "1.0"),
        )
        .unwrap();
        std::os::unix::fs::symlink("spec/foo.gemspec", tmp.path().join("foo.gemspec")).unwrap();

        let located = locate_spec(tmp.path()).unwrap();
        assert_eq!(located.path, tmp.path().join("foo.gemspec"));
        assert_eq!(located.spec.to_string(), "foo 1.0");
    }

    #[test]
    fn test_no_spec() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("README.md"), "").unwrap();

        let err = locate_spec(tmp.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SpecNotFound);
    }

    #[test]
    fn test_nested_spec_not_found() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(
            tmp.path().join("sub/foo.gemspec"),
            fixtures::gemspec_source("foo", "1.0"),
        )
        .unwrap();

        let err = locate_spec(tmp.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SpecNotFound);
    }

    #[test]
    fn test_multiple_specs_never_picked() {
        let tmp = TempDir::new().unwrap();
        for name in ["b", "a"] {
            std::fs::write(
                tmp.path().join(format!("{}.gemspec", name)),
                fixtures::gemspec_source(name, "1.0"),
            )
            .unwrap();
        }

        match locate_spec(tmp.path()).unwrap_err() {
            InstallError::AmbiguousSpec { candidates, .. } => {
                assert_eq!(candidates, vec!["a.gemspec", "b.gemspec"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparseable_spec() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("foo.gemspec"),
            "Gem::Specification.new do |s|\n  s.name = \"foo\"\n  s.version = \"#{ENV['V']}\"\nend\n",
        )
        .unwrap();

        let err = locate_spec(tmp.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SpecParse);
        assert!(err.to_string().contains("foo.gemspec"));
    }
}
