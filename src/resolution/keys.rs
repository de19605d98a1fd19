//! Node keys and values of the toolchain resolution graph.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::core::{
    BuildOptions, ConfigurationKey, Label, Package, PackageName, PlatformDescriptor,
    ToolchainContext, ToolchainDescriptor, ToolchainTypeRef,
};

/// Identity of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    /// The parsed `BUILD.toml` of a package.
    Package(PackageName),
    /// The build options registered under a configuration key.
    Configuration(ConfigurationKey),
    /// Execution candidates of a configuration, in priority order.
    RegisteredExecutionPlatforms(ConfigurationKey),
    /// Toolchains of a configuration, in registration order.
    RegisteredToolchains(ConfigurationKey),
    /// The resolved toolchains of one request.
    ToolchainContext(ToolchainContextKey),
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Package(name) => write!(f, "package {}", name),
            NodeKey::Configuration(config) => write!(f, "configuration {}", config),
            NodeKey::RegisteredExecutionPlatforms(config) => {
                write!(f, "registered execution platforms ({})", config)
            }
            NodeKey::RegisteredToolchains(config) => write!(f, "registered toolchains ({})", config),
            NodeKey::ToolchainContext(key) => fmt::Display::fmt(key, f),
        }
    }
}

/// Value of a node; the variant always matches the key's variant.
#[derive(Debug, Clone)]
pub enum NodeValue {
    Package(Arc<Package>),
    Configuration(Arc<BuildOptions>),
    ExecutionPlatforms(Arc<Vec<PlatformDescriptor>>),
    Toolchains(Arc<Vec<ToolchainDescriptor>>),
    ToolchainContext(Arc<ToolchainContext>),
}

/// Key of a toolchain resolution request.
///
/// The target description only appears in diagnostics; two requests that
/// differ only in their description are the same node.
#[derive(Debug, Clone)]
pub struct ToolchainContextKey {
    target_description: String,
    required_types: BTreeSet<ToolchainTypeRef>,
    exec_constraints: BTreeSet<Label>,
    configuration: ConfigurationKey,
}

impl ToolchainContextKey {
    pub fn new(target_description: impl Into<String>, configuration: ConfigurationKey) -> Self {
        ToolchainContextKey {
            target_description: target_description.into(),
            required_types: BTreeSet::new(),
            exec_constraints: BTreeSet::new(),
            configuration,
        }
    }

    pub fn with_required_types(mut self, types: impl IntoIterator<Item = ToolchainTypeRef>) -> Self {
        self.required_types.extend(types);
        self
    }

    pub fn with_exec_constraints(mut self, constraints: impl IntoIterator<Item = Label>) -> Self {
        self.exec_constraints.extend(constraints);
        self
    }

    pub fn target_description(&self) -> &str {
        &self.target_description
    }

    pub fn required_types(&self) -> &BTreeSet<ToolchainTypeRef> {
        &self.required_types
    }

    pub fn exec_constraints(&self) -> &BTreeSet<Label> {
        &self.exec_constraints
    }

    pub fn configuration(&self) -> &ConfigurationKey {
        &self.configuration
    }
}

impl PartialEq for ToolchainContextKey {
    fn eq(&self, other: &Self) -> bool {
        self.required_types == other.required_types
            && self.exec_constraints == other.exec_constraints
            && self.configuration == other.configuration
    }
}

impl Eq for ToolchainContextKey {}

impl Hash for ToolchainContextKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.required_types.hash(state);
        self.exec_constraints.hash(state);
        self.configuration.hash(state);
    }
}

impl fmt::Display for ToolchainContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toolchains of {} [", self.target_description)?;
        for (i, t) in self.required_types.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", t)?;
        }
        write!(f, "] ({})", self.configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn config() -> ConfigurationKey {
        BuildOptions::for_host(Label::parse("//host:host").unwrap()).configuration_key()
    }

    #[test]
    fn test_description_is_not_identity() {
        let cc: ToolchainTypeRef = Label::parse("//tools:cc").unwrap().into();
        let a = ToolchainContextKey::new("//app:a", config()).with_required_types([cc]);
        let b = ToolchainContextKey::new("//app:b", config()).with_required_types([cc]);

        assert_eq!(a, b);
        let set: HashSet<_> = [NodeKey::ToolchainContext(a), NodeKey::ToolchainContext(b)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_constraints_are_identity() {
        let a = ToolchainContextKey::new("//app:a", config());
        let b = ToolchainContextKey::new("//app:a", config())
            .with_exec_constraints([Label::parse("//constraints:linux").unwrap()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let key = ToolchainContextKey::new("//app:a", config())
            .with_required_types([Label::parse("//tools:cc").unwrap().into()]);
        let rendered = NodeKey::ToolchainContext(key).to_string();
        assert!(rendered.starts_with("toolchains of //app:a [//tools:cc] ("));
    }
}
