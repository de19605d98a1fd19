//! Loading package definitions.

use std::io;
use std::path::{Path, PathBuf};

use crate::core::package::BUILD_FILE_NAME;
use crate::core::{Package, PackageName};
use crate::resolution::ToolchainError;

/// Source of package definitions.
///
/// Implementations must be safe to call from several worker threads at once.
pub trait PackageLoader: Send + Sync {
    /// Load and parse the definitions of `package`.
    fn load(&self, package: &PackageName) -> Result<Package, ToolchainError>;
}

/// Loads `BUILD.toml` files from a workspace directory.
#[derive(Debug, Clone)]
pub struct FsPackageLoader {
    root: PathBuf,
}

impl FsPackageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsPackageLoader { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PackageLoader for FsPackageLoader {
    fn load(&self, package: &PackageName) -> Result<Package, ToolchainError> {
        let dir = self.root.join(package.relative_dir());
        let path = dir.join(BUILD_FILE_NAME);

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ToolchainError::NoSuchPackage {
                    package: package.clone(),
                    dir,
                });
            }
            Err(e) => {
                return Err(ToolchainError::Io {
                    package: package.clone(),
                    message: e.to_string(),
                });
            }
        };

        tracing::debug!("loaded {}", path.display());
        Ok(Package::parse(package.clone(), &contents)?)
    }
}
