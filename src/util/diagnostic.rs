//! User-friendly diagnostic messages.
//!
//! Every error printed to the user carries the failing item, the underlying
//! cause chain and, where one exists, a suggested fix.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;

use crate::core::errors::InstallError;

/// An error message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Build an error diagnostic from an error chain.
    ///
    /// The outermost message becomes the headline and every cause becomes a
    /// context line. If an [`InstallError`] is anywhere in the chain, its
    /// help text becomes a suggestion and its path becomes the location.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let mut chain = err.chain();
        let headline = chain
            .next()
            .map(|e| e.to_string())
            .unwrap_or_else(|| err.to_string());
        let mut diag = Diagnostic::error(headline);

        for cause in chain {
            let line = cause.to_string();
            // Tool stderr spans several lines; keep them all, in order.
            for part in line.lines().filter(|l| !l.trim().is_empty()) {
                diag = diag.with_context(part);
            }
        }

        if let Some(install_err) = err.chain().find_map(|e| e.downcast_ref::<InstallError>()) {
            if let Some(help) = install_err.help() {
                diag = diag.with_suggestion(help.to_string());
            }
            if let Some(path) = error_location(install_err) {
                diag = diag.with_location(path);
            }
        }

        diag
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let error_prefix = if color {
            "\x1b[1;31merror\x1b[0m"
        } else {
            "error"
        };

        output.push_str(&format!("{}: {}\n", error_prefix, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            if self.suggestions.len() == 1 {
                output.push_str(&format!("{}: {}\n", help_prefix, self.suggestions[0]));
            } else {
                output.push_str(&format!("{}: consider:\n", help_prefix));
                for (i, suggestion) in self.suggestions.iter().enumerate() {
                    output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
                }
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

fn error_location(err: &InstallError) -> Option<PathBuf> {
    match err {
        InstallError::SpecParse { path, .. } | InstallError::ExtractFailed { path, .. } => {
            Some(path.clone())
        }
        InstallError::BuildFailed { spec, .. } => Some(spec.clone()),
        _ => None,
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
