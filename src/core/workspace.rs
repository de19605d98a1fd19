//! Workspace - the directory tree holding packages and registrations.
//!
//! The workspace root is marked by a `WORKSPACE.toml`, which registers
//! toolchains and execution platforms for every build in the workspace:
//!
//! ```toml
//! register_toolchains = ["//extra:extra_toolchain_linux"]
//! register_execution_platforms = ["//platforms:mac", "//platforms:linux"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::label::{Label, PackageName};
use crate::core::package::BUILD_FILE_NAME;

/// File name marking the workspace root.
pub const WORKSPACE_FILE_NAME: &str = "WORKSPACE.toml";

/// Error locating the workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("could not find `WORKSPACE.toml` in `{}` or any parent directory", .dir.display())]
    NotFound { dir: PathBuf },
}

/// Toolchains and execution platforms registered by the workspace, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Registrations {
    pub register_toolchains: Vec<Label>,
    pub register_execution_platforms: Vec<Label>,
}

/// A loaded workspace.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    registrations: Registrations,
}

impl Workspace {
    /// Load the workspace rooted at `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(WORKSPACE_FILE_NAME);
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let registrations: Registrations = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        tracing::debug!(
            "loaded workspace {} ({} toolchains, {} execution platforms registered)",
            root.display(),
            registrations.register_toolchains.len(),
            registrations.register_execution_platforms.len()
        );

        Ok(Workspace {
            root: root.to_path_buf(),
            registrations,
        })
    }

    /// Find and load the workspace enclosing `start`.
    pub fn discover(start: &Path) -> Result<Self> {
        let root = find_workspace_root(start)?;
        Self::load(&root)
    }

    /// Create an in-memory workspace without a backing file.
    pub fn new(root: impl Into<PathBuf>, registrations: Registrations) -> Self {
        Workspace {
            root: root.into(),
            registrations,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registrations(&self) -> &Registrations {
        &self.registrations
    }

    /// Directory of `package`.
    pub fn package_dir(&self, package: &PackageName) -> PathBuf {
        self.root.join(package.relative_dir())
    }

    /// Path of the `BUILD.toml` of `package`.
    pub fn build_file(&self, package: &PackageName) -> PathBuf {
        self.package_dir(package).join(BUILD_FILE_NAME)
    }
}

/// Walk upward from `start` until a directory holding `WORKSPACE.toml` is found.
pub fn find_workspace_root(start: &Path) -> Result<PathBuf, WorkspaceError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(WORKSPACE_FILE_NAME).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(WorkspaceError::NotFound {
                dir: start.to_path_buf(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_workspace_root_from_subdirectory() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(WORKSPACE_FILE_NAME), "").unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_workspace_root(&nested).unwrap(), tmp.path());
    }

    #[test]
    fn test_find_workspace_root_missing() {
        let tmp = TempDir::new().unwrap();
        let err = find_workspace_root(tmp.path()).unwrap_err();
        assert!(err.to_string().contains(WORKSPACE_FILE_NAME));
    }

    #[test]
    fn test_load_registrations() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(WORKSPACE_FILE_NAME),
            r#"
register_toolchains = ["//extra:a", "//extra:b"]
register_execution_platforms = ["//platforms:mac"]
"#,
        )
        .unwrap();

        let ws = Workspace::load(tmp.path()).unwrap();
        let regs = ws.registrations();
        assert_eq!(regs.register_toolchains.len(), 2);
        assert_eq!(regs.register_toolchains[0].to_string(), "//extra:a");
        assert_eq!(
            regs.register_execution_platforms,
            vec![Label::parse("//platforms:mac").unwrap()]
        );
    }

    #[test]
    fn test_load_rejects_bad_label() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(WORKSPACE_FILE_NAME),
            "register_toolchains = [\"extra:a\"]\n",
        )
        .unwrap();

        assert!(Workspace::load(tmp.path()).is_err());
    }

    #[test]
    fn test_build_file_path() {
        let ws = Workspace::new("/ws", Registrations::default());
        let package = PackageName::new("fake/toolchain").unwrap();
        assert_eq!(
            ws.build_file(&package),
            PathBuf::from("/ws/fake/toolchain/BUILD.toml")
        );
    }
}
