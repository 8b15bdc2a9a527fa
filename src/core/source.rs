//! Source descriptors and package format detection.

use std::fmt;

use url::Url;

use crate::core::errors::InstallError;

/// How the user asked for the URL to be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Pick the format from the URL's file name.
    #[default]
    Auto,
    /// Treat the URL as a git repository regardless of its name.
    GitClone,
}

/// Where a package comes from, as given by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    url: String,
    mode: FetchMode,
}

impl SourceDescriptor {
    /// Create a new source descriptor.
    pub fn new(url: impl Into<String>, mode: FetchMode) -> Self {
        SourceDescriptor {
            url: url.into(),
            mode,
        }
    }

    /// Get the URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the fetch mode.
    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    /// Final path segment of the URL, without query string or fragment.
    pub fn file_name(&self) -> Option<String> {
        url_file_name(&self.url)
    }
}

/// Package format, derived from a [`SourceDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageFormat {
    Git,
    GemFile,
    TarGz,
    Zip,
}

impl PackageFormat {
    /// File name suffixes recognized for this format, longest first.
    pub fn suffixes(&self) -> &'static [&'static str] {
        match self {
            PackageFormat::Git => &[".git"],
            PackageFormat::GemFile => &[".gem"],
            PackageFormat::TarGz => &[".tar.gz", ".tgz"],
            PackageFormat::Zip => &[".zip"],
        }
    }

    /// Whether the format needs to be unpacked before a gemspec can be found.
    pub fn is_archive(&self) -> bool {
        matches!(self, PackageFormat::TarGz | PackageFormat::Zip)
    }

    /// Strip this format's suffix from a file name (ASCII case-insensitive).
    ///
    /// `foo-1.0.tar.gz` becomes `foo-1.0`. Returns `None` if the name does not
    /// carry a recognized suffix or nothing would remain.
    pub fn strip_suffix<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        self.suffixes().iter().find_map(|suffix| {
            let cut = file_name.len().checked_sub(suffix.len())?;
            if cut == 0 || !file_name.is_char_boundary(cut) {
                return None;
            }
            let (stem, tail) = file_name.split_at(cut);
            tail.eq_ignore_ascii_case(suffix).then_some(stem)
        })
    }
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackageFormat::Git => "git repository",
            PackageFormat::GemFile => "gem",
            PackageFormat::TarGz => "tar.gz archive",
            PackageFormat::Zip => "zip archive",
        };
        f.write_str(name)
    }
}

/// Detect the package format of a source.
///
/// Explicit repository mode always wins; otherwise the file name suffix of the
/// URL decides. This never touches the network or the filesystem.
pub fn detect_format(source: &SourceDescriptor) -> Result<PackageFormat, InstallError> {
    if source.mode() == FetchMode::GitClone {
        return Ok(PackageFormat::Git);
    }

    let unsupported = || InstallError::UnsupportedFormat {
        url: source.url().to_string(),
    };
    let name = source.file_name().ok_or_else(unsupported)?;

    [
        PackageFormat::Git,
        PackageFormat::GemFile,
        PackageFormat::TarGz,
        PackageFormat::Zip,
    ]
    .into_iter()
    .find(|format| format.strip_suffix(&name).is_some())
    .ok_or_else(unsupported)
}

/// Extract the final path segment of a URL or path.
///
/// Absolute URLs are parsed properly (query and fragment are ignored). Anything
/// that does not parse as one, such as a local path or an scp-style git remote
/// (`git@host:org/repo.git`), is split on `/` after dropping `?...` and `#...`.
pub fn url_file_name(url: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(url) {
        // A one-letter scheme is a Windows drive letter, not a URL.
        if parsed.scheme().len() > 1 {
            return parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string);
        }
    }

    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.rsplit(['/', '\\', ':'])
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
