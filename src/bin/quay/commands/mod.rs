//! Command implementations

pub mod completions;
pub mod platforms;
pub mod resolve;
pub mod toolchains;

use anyhow::Result;

use crate::cli::PlatformFlags;
use quay::core::{BuildOptions, Workspace, WorkspaceError};
use quay::util::config::Config;
use quay::util::diagnostic::{MissingHostPlatformError, WorkspaceNotFoundError};
use quay::util::GlobalContext;

/// Find and load the enclosing workspace and its merged configuration.
pub fn open_workspace(ctx: &GlobalContext) -> Result<(Workspace, Config)> {
    let root = ctx.find_workspace_root().map_err(|e| match e {
        WorkspaceError::NotFound { dir } => WorkspaceNotFoundError { dir },
    })?;
    let ws = Workspace::load(&root)?;
    let config = ctx.load_config(&root);
    Ok((ws, config))
}

/// Build options from the command line, falling back to the config.
pub fn build_options(flags: &PlatformFlags, config: &Config) -> Result<BuildOptions> {
    let host = flags
        .host_platform
        .or(config.platforms.host_platform)
        .ok_or(MissingHostPlatformError)?;
    let target = flags
        .platforms
        .or(config.platforms.platforms)
        .unwrap_or(host);

    Ok(BuildOptions::for_host(host)
        .with_target_platform(target)
        .with_extra_execution_platforms(flags.extra_execution_platforms.clone())
        .with_extra_toolchains(flags.extra_toolchains.clone()))
}
