//! Toolchain resolution as nodes of the evaluation graph.
//!
//! The graph has five kinds of nodes (see [`NodeKey`]). Package nodes load
//! `BUILD.toml` files; everything else is derived from them and from the
//! build options registered with the [`ToolchainGraph`]:
//!
//! ```text
//! ToolchainContext ─┬─> Configuration
//!                   ├─> RegisteredExecutionPlatforms ─> Configuration, Package*
//!                   ├─> RegisteredToolchains ─────────> Configuration, Package*
//!                   └─> Package* (target platform, execution constraints)
//! ```

pub mod constraint_lookup;
pub mod context;
pub mod errors;
pub mod functions;
pub mod keys;
pub mod loader;
pub mod platform_lookup;
pub mod registry;
pub mod resolve;

pub use errors::{InvalidReason, ToolchainError};
pub use functions::{GraphEnv, Lookup, ToolchainGraph};
pub use keys::{NodeKey, NodeValue, ToolchainContextKey};
pub use loader::{FsPackageLoader, PackageLoader};
pub use resolve::{resolve, Resolution, ResolutionRequest};
