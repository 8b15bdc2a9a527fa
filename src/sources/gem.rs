//! Reading the specification embedded in a `.gem` file.
//!
//! A gem is a plain tar archive whose `metadata.gz` entry holds the
//! specification as gzipped YAML. Only `name` and `version` are needed here,
//! so the YAML is scanned line by line instead of being deserialized; Ruby
//! object tags are never interpreted.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

use crate::core::spec::{validate_gem_name, PackageSpec};
use crate::core::version::Version;

const METADATA_GZ: &str = "metadata.gz";
const METADATA: &str = "metadata";

/// Read name and version from a `.gem` file.
pub fn read_gem_spec(path: &Path) -> Result<PackageSpec> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut archive = Archive::new(file);

    for entry in archive.entries().context("failed to read gem entries")? {
        let mut entry = entry.context("failed to read gem entry")?;
        let compressed = match entry.path().context("failed to get entry path")?.to_str() {
            Some(METADATA_GZ) => true,
            Some(METADATA) => false,
            _ => continue,
        };

        let mut text = String::new();
        if compressed {
            GzDecoder::new(entry)
                .read_to_string(&mut text)
                .context("failed to decompress gem metadata")?;
        } else {
            entry
                .read_to_string(&mut text)
                .context("failed to read gem metadata")?;
        }

        return parse_gem_metadata(&text);
    }

    bail!("no metadata found in {}", path.display())
}

/// Extract name and version from gem metadata YAML.
pub fn parse_gem_metadata(text: &str) -> Result<PackageSpec> {
    let mut name = None;
    let mut version = None;
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.next() {
        if line.starts_with([' ', '\t']) {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key {
            "name" => name = Some(unquote(value).to_string()),
            "version" if value.is_empty() || value.starts_with('!') => {
                // Tagged `Gem::Version` object: the number is a nested key.
                while let Some(nested) = lines.next_if(|l| l.starts_with([' ', '\t'])) {
                    if let Some(v) = nested.trim().strip_prefix("version:") {
                        version = Some(unquote(v.trim()).to_string());
                    }
                }
            }
            "version" => version = Some(unquote(value).to_string()),
            _ => {}
        }
    }

    let name = name.context("gem metadata has no `name`")?;
    let version = version.context("gem metadata has no `version`")?;

    validate_gem_name(&name).map_err(anyhow::Error::msg)?;
    let version: Version = version.parse()?;
    Ok(PackageSpec::new(name, version))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures;
    use tempfile::TempDir;

    #[test]
    fn test_parse_tagged_version() {
        let yaml = "--- !ruby/object:Gem::Specification\n\
                    name: foo\n\
                    version: !ruby/object:Gem::Version\n  version: 1.2.0\n\
                    platform: ruby\n";

        let spec = parse_gem_metadata(yaml).unwrap();
        assert_eq!(spec.name(), "foo");
        assert_eq!(spec.version().as_str(), "1.2.0");
    }

    #[test]
    fn test_parse_quoted_values() {
        let yaml = "name: 'foo-bar'\nversion: \"0.9\"\n";

        let spec = parse_gem_metadata(yaml).unwrap();
        assert_eq!(spec.name(), "foo-bar");
        assert_eq!(spec.version().as_str(), "0.9");
    }

    #[test]
    fn test_nested_keys_ignored() {
        // `name:` under dependencies must not override the gem name.
        let yaml = "name: foo\n\
                    version: !ruby/object:Gem::Version\n  version: 1.0\n\
                    dependencies:\n- !ruby/object:Gem::Dependency\n  name: rake\n";

        let spec = parse_gem_metadata(yaml).unwrap();
        assert_eq!(spec.name(), "foo");
    }

    #[test]
    fn test_missing_fields() {
        let err = parse_gem_metadata("name: foo\n").unwrap_err();
        assert!(err.to_string().contains("version"));

        let err = parse_gem_metadata("version: 1.0\n").unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_read_gem_spec() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bar.gem");
        std::fs::write(&path, fixtures::gem_file("bar", "0.9")).unwrap();

        let spec = read_gem_spec(&path).unwrap();
        assert_eq!(spec.to_string(), "bar 0.9");
    }

    #[test]
    fn test_read_gem_spec_not_a_gem() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bar.gem");
        std::fs::write(&path, fixtures::tar_raw(&[("README", "hi")])).unwrap();

        assert!(read_gem_spec(&path).is_err());
    }
}
