//! Inspecting the registry view of a workspace.

use anyhow::{Context, Result};

use crate::core::{BuildOptions, PlatformDescriptor, ToolchainDescriptor, Workspace};
use crate::ops::session::ResolutionSession;

/// Execution platform candidates of `ws` under `options`, in priority order.
pub fn execution_platforms(ws: &Workspace, options: BuildOptions) -> Result<Vec<PlatformDescriptor>> {
    let platforms = ResolutionSession::new(ws, None)
        .execution_platforms(options)
        .context("failed to load execution platforms")?;
    tracing::info!("{} execution platform candidate(s)", platforms.len());
    Ok(platforms)
}

/// Toolchains of `ws` under `options`, in priority order.
pub fn registered_toolchains(ws: &Workspace, options: BuildOptions) -> Result<Vec<ToolchainDescriptor>> {
    let toolchains = ResolutionSession::new(ws, None)
        .registered_toolchains(options)
        .context("failed to load registered toolchains")?;
    tracing::info!("{} registered toolchain(s)", toolchains.len());
    Ok(toolchains)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Label;
    use crate::test_support::fixtures::{self, WorkspaceFixture};
    use tempfile::TempDir;

    fn label(s: &str) -> Label {
        Label::parse(s).unwrap()
    }

    #[test]
    fn test_execution_platforms_in_priority_order() {
        let tmp = TempDir::new().unwrap();
        WorkspaceFixture::standard().write_to(tmp.path()).unwrap();
        let ws = Workspace::load(tmp.path()).unwrap();
        let options = fixtures::standard_options()
            .with_extra_execution_platforms(vec![label("//sample:sample_b")]);

        let platforms = execution_platforms(&ws, options).unwrap();
        let labels: Vec<_> = platforms.iter().map(|p| p.label().to_string()).collect();
        assert_eq!(
            labels,
            vec!["//host:host", "//sample:sample_b", "//platforms:mac", "//platforms:linux"]
        );
    }

    #[test]
    fn test_registered_toolchains_extra_first() {
        let tmp = TempDir::new().unwrap();
        WorkspaceFixture::standard().write_to(tmp.path()).unwrap();
        let ws = Workspace::load(tmp.path()).unwrap();

        let toolchains = registered_toolchains(&ws, fixtures::standard_options()).unwrap();
        let labels: Vec<_> = toolchains.iter().map(|t| t.label.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "//extra:extra_toolchain_linux",
                "//extra:extra_toolchain_mac",
                "//toolchain:toolchain_1",
                "//toolchain:toolchain_2",
            ]
        );
    }

    #[test]
    fn test_missing_registered_package_has_context() {
        let tmp = TempDir::new().unwrap();
        WorkspaceFixture::standard()
            .with_registrations(crate::core::Registrations {
                register_toolchains: vec![label("//gone:toolchain")],
                register_execution_platforms: vec![],
            })
            .write_to(tmp.path())
            .unwrap();
        let ws = Workspace::load(tmp.path()).unwrap();

        let err = registered_toolchains(&ws, fixtures::standard_options()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.starts_with("failed to load registered toolchains: "), "{}", message);
        assert!(message.contains("BUILD file not found"), "{}", message);
    }
}
