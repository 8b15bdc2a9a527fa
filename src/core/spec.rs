//! Package specification - the name/version pair an install is about.

use std::fmt;

use crate::core::version::Version;

/// Name and version of a gem, as declared by its gemspec or gem metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpec {
    name: String,
    version: Version,
}

impl PackageSpec {
    /// Create a new package spec.
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        PackageSpec {
            name: name.into(),
            version,
        }
    }

    /// Get the gem name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the gem version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// File name `gem build` produces for this spec: `<name>-<version>.gem`,
    /// with the version in the package manager's spelling.
    pub fn package_file_name(&self) -> String {
        format!("{}-{}.gem", self.name, self.version.to_gem_string())
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Check that a gem name only uses characters the package manager accepts.
pub fn validate_gem_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("gem name cannot be empty".to_string());
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!("invalid character `{}` in gem name `{}`", c, name));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("gem name `{}` must start with a letter, digit or `_`", name));
    }
    Ok(())
}
