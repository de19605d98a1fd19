//! High-level operations.
//!
//! This module contains the implementation of Quay commands.

pub mod registry;
pub mod resolve_toolchains;
pub mod session;

pub use registry::{execution_platforms, registered_toolchains};
pub use resolve_toolchains::{resolve_toolchains, ResolveOptions};
pub use session::{RequestOutcome, ResolutionSession, ResolveReport, ToolchainRequest};
