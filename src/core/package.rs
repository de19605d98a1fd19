//! Package definitions - the contents of a `BUILD.toml`.
//!
//! Each package directory declares named build units. Only a few kinds
//! matter for toolchain resolution; everything else is kept as an opaque
//! [`Definition::Rule`] so that lookups can report a kind mismatch instead
//! of a missing target.
//!
//! ```toml
//! [[constraint_setting]]
//! name = "os"
//!
//! [[constraint_value]]
//! name = "linux"
//! constraint_setting = ":os"
//!
//! [[platform]]
//! name = "linux"
//! constraint_values = [":linux"]
//!
//! [[rule]]
//! kind = "filegroup"
//! name = "not_a_platform"
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::core::label::{Label, LabelError, PackageName};

/// File name of a package's definitions.
pub const BUILD_FILE_NAME: &str = "BUILD.toml";

/// Error loading a package's definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageError {
    #[error("failed to parse BUILD.toml of package '{package}': {message}")]
    Parse { package: PackageName, message: String },

    #[error("invalid label in package '{package}': {source}")]
    InvalidLabel {
        package: PackageName,
        #[source]
        source: LabelError,
    },

    #[error("target '{name}' is declared more than once in package '{package}'")]
    DuplicateTarget { package: PackageName, name: String },
}

/// Kind tag of a definition, used by lookups to reject the wrong kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    ConstraintSetting,
    ConstraintValue,
    Platform,
    ToolchainType,
    Toolchain,
    Rule,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DefinitionKind::ConstraintSetting => "constraint_setting",
            DefinitionKind::ConstraintValue => "constraint_value",
            DefinitionKind::Platform => "platform",
            DefinitionKind::ToolchainType => "toolchain_type",
            DefinitionKind::Toolchain => "toolchain",
            DefinitionKind::Rule => "rule",
        };
        write!(f, "{}", s)
    }
}

/// A declared build unit with all labels made absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    ConstraintSetting,
    ConstraintValue {
        setting: Label,
    },
    Platform {
        constraint_values: Vec<Label>,
    },
    ToolchainType,
    Toolchain {
        toolchain_type: Label,
        exec_compatible_with: Vec<Label>,
        target_compatible_with: Vec<Label>,
        implementation: Label,
    },
    Rule {
        kind: String,
    },
}

impl Definition {
    pub fn kind(&self) -> DefinitionKind {
        match self {
            Definition::ConstraintSetting => DefinitionKind::ConstraintSetting,
            Definition::ConstraintValue { .. } => DefinitionKind::ConstraintValue,
            Definition::Platform { .. } => DefinitionKind::Platform,
            Definition::ToolchainType => DefinitionKind::ToolchainType,
            Definition::Toolchain { .. } => DefinitionKind::Toolchain,
            Definition::Rule { .. } => DefinitionKind::Rule,
        }
    }

    /// Human readable kind, e.g. `platform` or `filegroup`.
    pub fn kind_name(&self) -> String {
        match self {
            Definition::Rule { kind } => kind.clone(),
            other => other.kind().to_string(),
        }
    }
}

/// All definitions of one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    name: PackageName,
    definitions: BTreeMap<String, Definition>,
}

impl Package {
    /// Create an empty package.
    pub fn new(name: PackageName) -> Self {
        Package {
            name,
            definitions: BTreeMap::new(),
        }
    }

    /// Parse the contents of a `BUILD.toml`.
    pub fn parse(name: PackageName, contents: &str) -> Result<Self, PackageError> {
        let raw: RawBuildFile = toml::from_str(contents).map_err(|e| PackageError::Parse {
            package: name.clone(),
            message: e.message().to_string(),
        })?;

        let mut package = Package::new(name);
        let resolve = |package: &PackageName, text: &str| {
            Label::parse_relative(text, package).map_err(|source| PackageError::InvalidLabel {
                package: package.clone(),
                source,
            })
        };
        let resolve_all = |package: &PackageName, texts: &[String]| {
            texts
                .iter()
                .map(|t| resolve(package, t))
                .collect::<Result<Vec<_>, _>>()
        };

        for setting in raw.constraint_setting {
            package.insert(setting.name, Definition::ConstraintSetting)?;
        }
        for value in raw.constraint_value {
            let setting = resolve(&package.name, &value.constraint_setting)?;
            package.insert(value.name, Definition::ConstraintValue { setting })?;
        }
        for platform in raw.platform {
            let constraint_values = resolve_all(&package.name, &platform.constraint_values)?;
            package.insert(platform.name, Definition::Platform { constraint_values })?;
        }
        for toolchain_type in raw.toolchain_type {
            package.insert(toolchain_type.name, Definition::ToolchainType)?;
        }
        for toolchain in raw.toolchain {
            let definition = Definition::Toolchain {
                toolchain_type: resolve(&package.name, &toolchain.toolchain_type)?,
                exec_compatible_with: resolve_all(&package.name, &toolchain.exec_compatible_with)?,
                target_compatible_with: resolve_all(
                    &package.name,
                    &toolchain.target_compatible_with,
                )?,
                implementation: resolve(&package.name, &toolchain.toolchain)?,
            };
            package.insert(toolchain.name, definition)?;
        }
        for rule in raw.rule {
            package.insert(rule.name, Definition::Rule { kind: rule.kind })?;
        }

        Ok(package)
    }

    /// Add a definition, rejecting duplicate names.
    pub fn insert(&mut self, name: String, definition: Definition) -> Result<(), PackageError> {
        // Validates the name as a label target
        Label::new(self.name.clone(), name.clone()).map_err(|source| {
            PackageError::InvalidLabel {
                package: self.name.clone(),
                source,
            }
        })?;

        if self.definitions.contains_key(&name) {
            return Err(PackageError::DuplicateTarget {
                package: self.name.clone(),
                name,
            });
        }
        self.definitions.insert(name, definition);
        Ok(())
    }

    pub fn name(&self) -> &PackageName {
        &self.name
    }

    /// Look up a definition by target name.
    pub fn get(&self, target: &str) -> Option<&Definition> {
        self.definitions.get(target)
    }

    /// Iterate over `(label, definition)` pairs in name order.
    pub fn definitions(&self) -> impl Iterator<Item = (Label, &Definition)> + '_ {
        self.definitions.iter().filter_map(move |(name, def)| {
            Label::new(self.name.clone(), name.clone())
                .ok()
                .map(|label| (label, def))
        })
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuildFile {
    #[serde(default)]
    constraint_setting: Vec<RawNamed>,
    #[serde(default)]
    constraint_value: Vec<RawConstraintValue>,
    #[serde(default)]
    platform: Vec<RawPlatform>,
    #[serde(default)]
    toolchain_type: Vec<RawNamed>,
    #[serde(default)]
    toolchain: Vec<RawToolchain>,
    #[serde(default)]
    rule: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNamed {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConstraintValue {
    name: String,
    constraint_setting: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPlatform {
    name: String,
    #[serde(default)]
    constraint_values: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawToolchain {
    name: String,
    toolchain_type: String,
    #[serde(default)]
    exec_compatible_with: Vec<String>,
    #[serde(default)]
    target_compatible_with: Vec<String>,
    toolchain: String,
}

/// Any other build unit. Extra attributes are accepted and ignored.
#[derive(Debug, Deserialize)]
struct RawRule {
    kind: String,
    name: String,
}
