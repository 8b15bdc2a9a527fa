//! Restricted gemspec reader.
//!
//! A gemspec is Ruby code, and the package manager obtains a spec by
//! evaluating it. `insturl` never executes a gemspec. Instead it reads the
//! declarative subset that nearly all gemspecs use for the two fields it needs:
//!
//! ```ruby
//! require_relative "lib/foo/version"
//!
//! Gem::Specification.new do |spec|
//!   spec.name    = "foo"
//!   spec.version = Foo::VERSION   # or "1.2.3", '1.2.3'.freeze
//! end
//! ```
//!
//! Accepted right-hand sides are plain string literals (no interpolation,
//! optionally followed by `.freeze`, `.dup` or `.to_s`) and constant references.
//! Constants are resolved by reading `NAME = "literal"` assignments from the
//! gemspec itself and from `.rb` files under `lib/`. Any other expression is
//! rejected with [`GemspecError::UnsupportedExpression`]; the gem's own
//! `gem build` step, run later, is the only place its Ruby code is evaluated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use walkdir::WalkDir;

use crate::core::spec::{validate_gem_name, PackageSpec};
use crate::core::version::Version;

/// Error while reading a gemspec.
#[derive(Debug, Error)]
pub enum GemspecError {
    #[error("failed to read gemspec: {0}")]
    Io(#[from] std::io::Error),

    #[error("no `Gem::Specification.new do |spec|` block found")]
    NoSpecificationBlock,

    #[error("`{field}` is not set")]
    MissingField { field: &'static str },

    #[error("unsupported expression for `{field}`: `{expr}` (only string literals and constants are read)")]
    UnsupportedExpression { field: &'static str, expr: String },

    #[error("constant `{name}` is not defined as a string literal in the gemspec or under lib/")]
    UnresolvedConstant { name: String },

    #[error("constant `{name}` has conflicting definitions: {}", .definitions.join(", "))]
    AmbiguousConstant {
        name: String,
        definitions: Vec<String>,
    },

    #[error("invalid gem name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    InvalidVersion(#[from] crate::core::version::VersionParseError),
}

static SPEC_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Gem::Specification\.new\s*(?:\([^)]*\))?\s*(?:do|\{)\s*\|\s*([A-Za-z_]\w*)\s*\|")
        .unwrap()
});

static CONSTANT_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:::)?(?:[A-Z]\w*::)*([A-Z][A-Z0-9_]*)$").unwrap()
});

static CONSTANT_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*([A-Z][A-Z0-9_]*)\s*=\s*(?:"([^"\\#]*)"|'([^'\\]*)')(?:\.freeze)?\s*$"#)
        .unwrap()
});

/// Read the name and version declared by a gemspec file.
pub fn read_gemspec(path: &Path) -> Result<PackageSpec, GemspecError> {
    let source = std::fs::read_to_string(path)?;
    let root = path.parent().unwrap_or(Path::new("."));
    parse_gemspec(&source, root)
}

/// Parse gemspec source. `root` is the directory the gemspec lives in; its
/// `lib/` tree is searched when a field refers to a constant.
pub fn parse_gemspec(source: &str, root: &Path) -> Result<PackageSpec, GemspecError> {
    let code: String = source
        .lines()
        .map(strip_comment)
        .collect::<Vec<_>>()
        .join("\n");

    let var = SPEC_BLOCK
        .captures(&code)
        .map(|c| c[1].to_string())
        .ok_or(GemspecError::NoSpecificationBlock)?;

    let mut constants = ConstantTable::new(root, &code);

    let name_expr = assignment(&code, &var, "name").ok_or(GemspecError::MissingField { field: "name" })?;
    let name = evaluate(&name_expr, "name", &mut constants, None)?;
    validate_gem_name(&name).map_err(GemspecError::InvalidName)?;

    let version_expr =
        assignment(&code, &var, "version").ok_or(GemspecError::MissingField { field: "version" })?;
    let version = evaluate(&version_expr, "version", &mut constants, Some(&name))?;
    let version: Version = version.parse()?;

    Ok(PackageSpec::new(name, version))
}

/// Right-hand side of the last `<var>.<field> = ...` assignment.
fn assignment(code: &str, var: &str, field: &str) -> Option<String> {
    let pattern = format!(
        r"(?m)^\s*{}\.{}\s*=\s*(.+?)\s*$",
        regex::escape(var),
        regex::escape(field)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures_iter(code).last().map(|c| c[1].to_string())
}

/// Evaluate a right-hand side in the restricted subset.
fn evaluate(
    expr: &str,
    field: &'static str,
    constants: &mut ConstantTable,
    gem_name: Option<&str>,
) -> Result<String, GemspecError> {
    let unsupported = || GemspecError::UnsupportedExpression {
        field,
        expr: expr.to_string(),
    };

    let mut value = expr.trim();
    while let Some(rest) = [".freeze", ".dup", ".to_s"]
        .iter()
        .find_map(|m| value.strip_suffix(*m))
    {
        value = rest.trim_end();
    }

    if let Some(literal) = string_literal(value) {
        return literal.ok_or_else(unsupported);
    }

    if let Some(caps) = CONSTANT_REF.captures(value) {
        return constants.resolve(&caps[1], gem_name);
    }

    Err(unsupported())
}

/// Decode a quoted Ruby string literal.
///
/// Returns `None` if `value` is not a quoted literal at all, `Some(None)` if it
/// is one we refuse to read (interpolation, embedded quotes).
fn string_literal(value: &str) -> Option<Option<String>> {
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = value.strip_prefix(quote)?.strip_suffix(quote);
    let inner = match inner {
        Some(inner) if value.len() >= 2 => inner,
        _ => return Some(None),
    };

    if inner.contains(quote) || inner.contains('\\') || (quote == '"' && inner.contains("#{")) {
        return Some(None);
    }
    Some(Some(inner.to_string()))
}

/// Remove a trailing `# comment`, ignoring `#` inside string literals.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '#' => return &line[..i],
                _ => {}
            },
        }
    }
    line
}

/// Lazily collected `NAME = "literal"` definitions.
struct ConstantTable {
    root: PathBuf,
    // constant name -> (defining file relative to root, value)
    definitions: BTreeMap<String, Vec<(String, String)>>,
    scanned: bool,
}

impl ConstantTable {
    fn new(root: &Path, gemspec_code: &str) -> Self {
        let mut table = ConstantTable {
            root: root.to_path_buf(),
            definitions: BTreeMap::new(),
            scanned: false,
        };
        table.collect("<gemspec>", gemspec_code);
        table
    }

    fn collect(&mut self, file: &str, code: &str) {
        for caps in CONSTANT_DEF.captures_iter(code) {
            let value = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
            if let Some(value) = value {
                self.definitions
                    .entry(caps[1].to_string())
                    .or_default()
                    .push((file.to_string(), value.to_string()));
            }
        }
    }

    fn scan_lib(&mut self) {
        if self.scanned {
            return;
        }
        self.scanned = true;

        let lib = self.root.join("lib");
        for entry in WalkDir::new(&lib)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "rb"))
        {
            let Ok(code) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            let code: String = code.lines().map(strip_comment).collect::<Vec<_>>().join("\n");
            self.collect(&rel, &code);
        }
    }

    fn resolve(&mut self, name: &str, gem_name: Option<&str>) -> Result<String, GemspecError> {
        if !self.definitions.contains_key(name) {
            self.scan_lib();
        }
        let defs = self
            .definitions
            .get(name)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| GemspecError::UnresolvedConstant {
                name: name.to_string(),
            })?;

        let mut values: Vec<&str> = defs.iter().map(|(_, v)| v.as_str()).collect();
        values.sort_unstable();
        values.dedup();
        if let [value] = values.as_slice() {
            return Ok(value.to_string());
        }

        // Several different values: prefer the one under the gem's own lib dir.
        if let Some(gem_name) = gem_name {
            let prefixes = [
                format!("lib/{}/", gem_name),
                format!("lib/{}/", gem_name.replace('-', "/")),
                format!("lib/{}/", gem_name.replace('-', "_")),
            ];
            let owned: Vec<&(String, String)> = defs
                .iter()
                .filter(|(file, _)| prefixes.iter().any(|p| file.starts_with(p.as_str())))
                .collect();
            if let [(_, value)] = owned.as_slice() {
                return Ok(value.clone());
            }
        }

        Err(GemspecError::AmbiguousConstant {
            name: name.to_string(),
            definitions: defs
                .iter()
                .map(|(file, value)| format!("{} = {:?} in {}", name, value, file))
                .collect(),
        })
    }
}
