//! RubyGems-style version strings.
//!
//! Gem versions are not semver: `1.0`, `2.3.1.pre`, `0.9.0.rc1` are all valid.
//! Comparison follows the package manager's own rules, so `1.0 == 1.0.0` and
//! textual segments sort before numeric ones (`1.0.a < 1.0`).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

/// Error returned when a version string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed version number string `{0}`")]
pub struct VersionParseError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Segment {
    // Declared first so textual (prerelease) segments order below numbers.
    Text(String),
    Number(u64),
}

/// A parsed gem version. Displays as the original text.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    // Canonical form; comparison pads the shorter side with zeros.
    segments: Vec<Segment>,
}

impl Version {
    /// Parse a version string.
    pub fn parse(s: &str) -> Result<Self, VersionParseError> {
        s.parse()
    }

    /// The version exactly as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The version as the package manager writes it, with `-` expanded to
    /// `.pre.` (`1.0-beta` becomes `1.0.pre.beta`).
    pub fn to_gem_string(&self) -> String {
        self.raw.replace('-', ".pre.")
    }
}

/// Drop trailing zeros from the release part and from the prerelease part,
/// so `1.0.0.pre` and `1.pre` share one form.
fn canonicalize(segments: &[Segment]) -> Vec<Segment> {
    let split = segments
        .iter()
        .position(|s| matches!(s, Segment::Text(_)))
        .unwrap_or(segments.len());
    let (release, prerelease) = segments.split_at(split);

    let mut canonical = strip_trailing_zeros(release).to_vec();
    canonical.extend_from_slice(strip_trailing_zeros(prerelease));
    canonical
}

fn strip_trailing_zeros(segments: &[Segment]) -> &[Segment] {
    let mut end = segments.len();
    while end > 0 && segments[end - 1] == Segment::Number(0) {
        end -= 1;
    }
    &segments[..end]
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let err = || VersionParseError(s.to_string());

        if raw.is_empty() || !raw.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(err());
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(err());
        }

        // `1.0-beta` is shorthand for `1.0.pre.beta`.
        let normalized = raw.replace('-', ".pre.");
        if normalized.split('.').any(str::is_empty) {
            return Err(err());
        }

        let mut segments = Vec::new();
        for part in normalized.split('.') {
            let mut rest = part;
            while !rest.is_empty() {
                let numeric = rest.starts_with(|c: char| c.is_ascii_digit());
                let len = rest
                    .find(|c: char| c.is_ascii_digit() != numeric)
                    .unwrap_or(rest.len());
                let (chunk, tail) = rest.split_at(len);
                if numeric {
                    segments.push(Segment::Number(chunk.parse().map_err(|_| err())?));
                } else {
                    segments.push(Segment::Text(chunk.to_string()));
                }
                rest = tail;
            }
        }

        Ok(Version {
            raw: raw.to_string(),
            segments: canonicalize(&segments),
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        let zero = Segment::Number(0);
        for i in 0..len {
            let lhs = self.segments.get(i).unwrap_or(&zero);
            let rhs = other.segments.get(i).unwrap_or(&zero);
            match lhs.cmp(rhs) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
