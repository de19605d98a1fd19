//! Core data types: labels, constraints, platforms, toolchains, packages.

pub mod constraint;
pub mod label;
pub mod options;
pub mod package;
pub mod platform;
pub mod toolchain;
pub mod workspace;

pub use constraint::{ConstraintSetting, ConstraintValue};
pub use label::{Label, LabelError, PackageName};
pub use options::{BuildOptions, ConfigurationKey};
pub use package::{Definition, DefinitionKind, Package, PackageError};
pub use platform::{PlatformDescriptor, PlatformError};
pub use toolchain::{ToolchainContext, ToolchainDescriptor, ToolchainTypeRef};
pub use workspace::{Registrations, Workspace, WorkspaceError};
