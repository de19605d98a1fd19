//! Toolchain resolution error types and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::constraint::describe_constraints;
use crate::core::{ConfigurationKey, ConstraintValue, Label, PackageError, PackageName, ToolchainTypeRef};
use crate::engine::{NodeError, Transience};
use crate::util::diagnostic::Diagnostic;

/// Why a referenced label cannot be used as the kind it was referenced as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// The label names a definition of another kind.
    WrongKind { found: String },
    /// The definition could not be loaded or is itself invalid.
    Cause(Box<ToolchainError>),
    /// The definition exists but is inconsistent.
    Malformed(String),
}

impl InvalidReason {
    pub fn cause(error: ToolchainError) -> Self {
        InvalidReason::Cause(Box::new(error))
    }
}

/// Error during toolchain resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolchainError {
    #[error("no such package '{package}': BUILD file not found in {}", .dir.display())]
    NoSuchPackage { package: PackageName, dir: PathBuf },

    #[error("no such target '{label}': target '{}' not declared in package '{}'", .label.name(), .label.package())]
    NoSuchTarget { label: Label },

    #[error(transparent)]
    MalformedPackage(#[from] PackageError),

    #[error("failed to read BUILD file of package '{package}': {message}")]
    Io { package: PackageName, message: String },

    #[error("{}", describe_invalid(.label, .reason, "platform", "PlatformInfo"))]
    InvalidPlatform { label: Label, reason: InvalidReason },

    #[error("{}", describe_invalid(.label, .reason, "constraint_value", "ConstraintValueInfo"))]
    InvalidConstraintValue { label: Label, reason: InvalidReason },

    #[error("{}", describe_invalid(.label, .reason, "toolchain", "DeclaredToolchainInfo"))]
    InvalidToolchain { label: Label, reason: InvalidReason },

    #[error("no matching toolchains found for types {}", join(.types))]
    UnresolvedToolchains { types: Vec<ToolchainTypeRef> },

    #[error(
        "no available execution platform satisfies all requested toolchain types along with constraints: {}",
        describe_constraints(.constraints)
    )]
    NoMatchingPlatform { constraints: Vec<ConstraintValue> },

    #[error("unknown build configuration {0}")]
    UnknownConfiguration(ConfigurationKey),

    #[error("dependency cycle while evaluating {key}: {}", .cycle.join(" -> "))]
    Cycle { key: String, cycle: Vec<String> },

    #[error("internal error: {key} returned no value without a missing dependency")]
    Incomplete { key: String },

    #[error("While resolving toolchains for target {target}: {source}")]
    InTarget {
        target: String,
        #[source]
        source: Box<ToolchainError>,
    },
}

fn describe_invalid(label: &Label, reason: &InvalidReason, kind: &str, provider: &str) -> String {
    match reason {
        InvalidReason::WrongKind { .. } => format!(
            "{} was referenced as a {}, but does not provide {}",
            label, kind, provider
        ),
        InvalidReason::Cause(cause) => format!("{} is not a valid {}: {}", label, kind, cause),
        InvalidReason::Malformed(message) => {
            format!("{} is not a valid {}: {}", label, kind, message)
        }
    }
}

fn join(types: &[ToolchainTypeRef]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ToolchainError {
    /// I/O failures may succeed on retry; everything else is a pure function
    /// of the workspace contents and the build options.
    pub fn transience(&self) -> Transience {
        match self {
            ToolchainError::Io { .. } => Transience::Transient,
            ToolchainError::InvalidPlatform { reason, .. }
            | ToolchainError::InvalidConstraintValue { reason, .. }
            | ToolchainError::InvalidToolchain { reason, .. } => match reason {
                InvalidReason::Cause(cause) => cause.transience(),
                _ => Transience::Persistent,
            },
            ToolchainError::InTarget { source, .. } => source.transience(),
            _ => Transience::Persistent,
        }
    }

    /// Attach the description of the request this error was reported for.
    pub fn in_target(self, target: impl Into<String>) -> Self {
        match self {
            // Never wrap twice
            ToolchainError::InTarget { source, .. } => ToolchainError::InTarget {
                target: target.into(),
                source,
            },
            other => ToolchainError::InTarget {
                target: target.into(),
                source: Box::new(other),
            },
        }
    }

    /// The error without any target description.
    pub fn root(&self) -> &ToolchainError {
        match self {
            ToolchainError::InTarget { source, .. } => source.root(),
            other => other,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ToolchainError::InTarget { target, source } => source
                .to_diagnostic()
                .with_context(format!("while resolving toolchains for target {}", target)),

            ToolchainError::NoSuchPackage { package, dir } => Diagnostic::error(self.to_string())
                .with_location(dir.clone())
                .with_suggestion(format!(
                    "Create {}/BUILD.toml or fix the references to {}",
                    dir.display(),
                    package
                )),

            ToolchainError::NoSuchTarget { label } => Diagnostic::error(self.to_string())
                .with_suggestion(format!(
                    "Declare `{}` in the BUILD.toml of {}",
                    label.name(),
                    label.package()
                )),

            ToolchainError::MalformedPackage(_) => Diagnostic::error(self.to_string())
                .with_suggestion("Check the BUILD.toml syntax and table names"),

            ToolchainError::Io { .. } => Diagnostic::error(self.to_string()),

            ToolchainError::InvalidPlatform { reason, .. } => {
                invalid_diagnostic(self, reason, "a `[[platform]]`")
            }
            ToolchainError::InvalidConstraintValue { reason, .. } => {
                invalid_diagnostic(self, reason, "a `[[constraint_value]]`")
            }
            ToolchainError::InvalidToolchain { reason, .. } => {
                invalid_diagnostic(self, reason, "a `[[toolchain]]`")
            }

            ToolchainError::UnresolvedToolchains { types } => {
                let mut diag = Diagnostic::error(self.to_string());
                for t in types {
                    diag = diag.with_context(format!(
                        "no toolchain of type {} is registered",
                        t
                    ));
                }
                diag.with_suggestion(
                    "Register a toolchain with `register_toolchains` in WORKSPACE.toml or pass `--extra-toolchains`",
                )
            }

            ToolchainError::NoMatchingPlatform { constraints } => {
                let mut diag = Diagnostic::error(self.to_string());
                if !constraints.is_empty() {
                    diag = diag.with_context(format!(
                        "execution constraints: {}",
                        describe_constraints(constraints)
                    ));
                }
                diag.with_suggestion(
                    "Register an execution platform with `register_execution_platforms` or pass `--extra-execution-platforms`",
                )
            }

            ToolchainError::UnknownConfiguration(_)
            | ToolchainError::Cycle { .. }
            | ToolchainError::Incomplete { .. } => {
                Diagnostic::error(self.to_string())
            }
        }
    }
}

impl From<ToolchainError> for NodeError<ToolchainError> {
    fn from(error: ToolchainError) -> Self {
        let transience = error.transience();
        NodeError::new(error, transience)
    }
}

fn invalid_diagnostic(error: &ToolchainError, reason: &InvalidReason, expected: &str) -> Diagnostic {
    let diag = Diagnostic::error(error.to_string());
    match reason {
        InvalidReason::WrongKind { found } => diag
            .with_context(format!("it is declared as a `{}`", found))
            .with_suggestion(format!("Reference {} declaration instead", expected)),
        InvalidReason::Cause(_) | InvalidReason::Malformed(_) => diag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> Label {
        Label::parse(s).unwrap()
    }

    #[test]
    fn test_wrong_kind_messages() {
        let err = ToolchainError::InvalidPlatform {
            label: label("//invalid:not_a_platform"),
            reason: InvalidReason::WrongKind {
                found: "filegroup".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "//invalid:not_a_platform was referenced as a platform, but does not provide PlatformInfo"
        );

        let err = ToolchainError::InvalidConstraintValue {
            label: label("//platforms:linux"),
            reason: InvalidReason::WrongKind {
                found: "platform".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "//platforms:linux was referenced as a constraint_value, but does not provide ConstraintValueInfo"
        );
    }

    #[test]
    fn test_missing_package_is_nested() {
        let missing = ToolchainError::NoSuchPackage {
            package: PackageName::new("platforms").unwrap(),
            dir: PathBuf::from("/ws/platforms"),
        };
        let err = ToolchainError::InvalidPlatform {
            label: label("//platforms:linux"),
            reason: InvalidReason::cause(missing),
        };
        let message = err.to_string();
        assert!(message.starts_with("//platforms:linux is not a valid platform"));
        assert!(message.contains("BUILD file not found"));
    }

    #[test]
    fn test_unresolved_types_message() {
        let err = ToolchainError::UnresolvedToolchains {
            types: vec![label("//fake/toolchain:type_1").into()],
        };
        assert_eq!(
            err.to_string(),
            "no matching toolchains found for types //fake/toolchain:type_1"
        );
    }

    #[test]
    fn test_no_matching_platform_without_constraints() {
        let err = ToolchainError::NoMatchingPlatform {
            constraints: Vec::new(),
        };
        assert!(err.to_string().ends_with("along with constraints: (none)"));
    }

    #[test]
    fn test_in_target_wraps_once() {
        let err = ToolchainError::UnknownConfiguration(
            crate::core::BuildOptions::for_host(label("//host:host")).configuration_key(),
        )
        .in_target("//app:a")
        .in_target("//app:b");

        assert!(err.to_string().starts_with("While resolving toolchains for target //app:b: "));
        assert!(matches!(err.root(), ToolchainError::UnknownConfiguration(_)));
    }

    #[test]
    fn test_transience_follows_cause() {
        let io = ToolchainError::Io {
            package: PackageName::new("platforms").unwrap(),
            message: "permission denied".to_string(),
        };
        let err = ToolchainError::InvalidPlatform {
            label: label("//platforms:linux"),
            reason: InvalidReason::cause(io),
        };
        assert_eq!(err.transience(), Transience::Transient);
        assert_eq!(
            ToolchainError::UnresolvedToolchains { types: vec![] }.transience(),
            Transience::Persistent
        );
    }
}
