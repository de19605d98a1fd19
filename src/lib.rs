//! Quay - toolchain resolution for multi-platform builds
//!
//! This crate selects, for each build request, an execution platform and one
//! concrete toolchain per required toolchain type. Resolution runs as nodes
//! of an incremental, memoized evaluation graph so that results are shared
//! between requests and recomputed only when their inputs change.

pub mod core;
pub mod engine;
pub mod ops;
pub mod resolution;
pub mod util;

/// Test utilities for Quay unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides an in-memory package loader and the standard
/// constraints, platforms, and toolchains workspace.
#[cfg(test)]
pub mod test_support;

pub use core::{
    label::Label, options::BuildOptions, platform::PlatformDescriptor,
    toolchain::ToolchainContext, workspace::Workspace,
};

pub use resolution::ToolchainError;
pub use util::context::GlobalContext;
