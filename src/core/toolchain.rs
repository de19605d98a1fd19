//! Toolchain types, registered toolchains, and the resolved toolchain context.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::core::{ConstraintValue, Label, PlatformDescriptor};

/// An abstract capability required by a build step (e.g. "a C compiler").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ToolchainTypeRef(Label);

impl ToolchainTypeRef {
    pub fn new(label: Label) -> Self {
        ToolchainTypeRef(label)
    }

    pub fn label(&self) -> Label {
        self.0
    }
}

impl fmt::Display for ToolchainTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Label> for ToolchainTypeRef {
    fn from(label: Label) -> Self {
        ToolchainTypeRef(label)
    }
}

/// A concrete toolchain registered as satisfying a toolchain type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainDescriptor {
    /// Label of the `toolchain` declaration itself
    pub label: Label,
    /// The type this toolchain implements
    pub toolchain_type: ToolchainTypeRef,
    /// Constraints the execution platform must satisfy
    pub exec_constraints: Vec<ConstraintValue>,
    /// Constraints the target platform must satisfy
    pub target_constraints: Vec<ConstraintValue>,
    /// Label of the implementation selected when this toolchain matches
    pub implementation: Label,
}

impl ToolchainDescriptor {
    /// Whether this toolchain can run on `exec` while building for `target`.
    pub fn matches(&self, exec: &PlatformDescriptor, target: &PlatformDescriptor) -> bool {
        exec.satisfies(&self.exec_constraints) && target.satisfies(&self.target_constraints)
    }
}

/// The result of toolchain resolution for one request.
///
/// Holds exactly one implementation per required type; resolution never
/// produces a partial context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainContext {
    target_description: String,
    required_types: BTreeSet<ToolchainTypeRef>,
    resolved: BTreeMap<ToolchainTypeRef, Label>,
    execution_platform: PlatformDescriptor,
    target_platform: PlatformDescriptor,
}

impl ToolchainContext {
    pub(crate) fn new(
        target_description: impl Into<String>,
        required_types: BTreeSet<ToolchainTypeRef>,
        resolved: BTreeMap<ToolchainTypeRef, Label>,
        execution_platform: PlatformDescriptor,
        target_platform: PlatformDescriptor,
    ) -> Self {
        debug_assert!(required_types.iter().eq(resolved.keys()));
        ToolchainContext {
            target_description: target_description.into(),
            required_types,
            resolved,
            execution_platform,
            target_platform,
        }
    }

    /// The same context, described as built for `target_description`.
    pub(crate) fn with_target_description(mut self, target_description: impl Into<String>) -> Self {
        self.target_description = target_description.into();
        self
    }

    /// Diagnostic description of the request this context was built for.
    pub fn target_description(&self) -> &str {
        &self.target_description
    }

    pub fn required_types(&self) -> &BTreeSet<ToolchainTypeRef> {
        &self.required_types
    }

    /// Resolved implementation per required type.
    pub fn resolved(&self) -> &BTreeMap<ToolchainTypeRef, Label> {
        &self.resolved
    }

    /// Resolved implementation labels, ordered by toolchain type.
    pub fn resolved_labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.resolved.values().copied()
    }

    /// The implementation resolved for `toolchain_type`.
    pub fn for_type(&self, toolchain_type: ToolchainTypeRef) -> Option<Label> {
        self.resolved.get(&toolchain_type).copied()
    }

    pub fn execution_platform(&self) -> &PlatformDescriptor {
        &self.execution_platform
    }

    pub fn target_platform(&self) -> &PlatformDescriptor {
        &self.target_platform
    }
}
