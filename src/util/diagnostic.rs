//! User-friendly diagnostic messages.
//!
//! Every error shown to the user names the offending label and, where
//! possible, what to change to fix it.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when some requests fail to resolve.
    pub const RESOLUTION_FAILED: &str =
        "Run `quay platforms` and `quay toolchains` with the same flags to inspect the candidates";

    /// Suggestion when a fail-fast evaluation skipped requests.
    pub const KEEP_GOING: &str = "Pass `--keep-going` to report every failing request";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file or directory)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
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
        let paint = |code: &str, text: &str| {
            if color {
                format!("\x1b[{}m{}\x1b[0m", code, text)
            } else {
                text.to_string()
            }
        };

        let severity = match self.severity {
            Severity::Error => paint("1;31", "error"),
            Severity::Warning => paint("1;33", "warning"),
        };

        let mut output = format!("{}: {}\n", severity, self.message);

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        match self.suggestions.as_slice() {
            [] => {}
            [only] => output.push_str(&format!("{}: {}\n", paint("1;32", "help"), only)),
            many => {
                output.push_str(&format!("{}: consider:\n", paint("1;32", "help")));
                for (i, suggestion) in many.iter().enumerate() {
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

/// No `WORKSPACE.toml` above the working directory.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("could not find `WORKSPACE.toml` in `{}` or any parent directory", .dir.display())]
#[diagnostic(
    code(quay::workspace::not_found),
    help("Create a WORKSPACE.toml at the root of the workspace")
)]
pub struct WorkspaceNotFoundError {
    pub dir: PathBuf,
}

/// Neither the command line nor the config names a host platform.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("no host platform configured")]
#[diagnostic(
    code(quay::config::no_host_platform),
    help("Pass `--host-platform` or set `host_platform` under `[platforms]` in .quay/config.toml")
)]
pub struct MissingHostPlatformError;

/// Some resolution requests failed.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("toolchain resolution failed for {failed} of {total} request(s)")]
#[diagnostic(code(quay::resolve::failed))]
pub struct ResolutionFailedError {
    pub failed: usize,
    pub total: usize,
    #[help]
    pub hint: Option<String>,
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("no matching toolchains found for types //tools:cc")
            .with_context("no toolchain of type //tools:cc is registered")
            .with_suggestion("Register a toolchain")
            .with_suggestion("Pass `--extra-toolchains`");

        let output = diag.format(false);
        assert!(output.starts_with("error: no matching toolchains"));
        assert!(output.contains("  = no toolchain of type //tools:cc"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("2. Pass `--extra-toolchains`"));
    }

    #[test]
    fn test_single_suggestion_is_inline() {
        let output = Diagnostic::warning("stale config")
            .with_location("/ws/.quay/config.toml")
            .with_suggestion("Delete it")
            .format(false);

        assert!(output.contains("warning: stale config"));
        assert!(output.contains("--> /ws/.quay/config.toml"));
        assert!(output.contains("help: Delete it"));
    }

    #[test]
    fn test_color_codes() {
        let output = Diagnostic::error("boom").format(true);
        assert!(output.contains("\x1b[1;31merror\x1b[0m"));
    }
}
