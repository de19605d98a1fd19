//! Test fixtures for common resolution scenarios.
//!
//! The standard workspace has one `os` constraint setting with `linux` and
//! `mac` values, a platform for each, a host platform without constraints,
//! and toolchains of `//toolchain:test_toolchain`:
//!
//! | toolchain                         | exec  | target |
//! |-----------------------------------|-------|--------|
//! | `//extra:extra_toolchain_linux`   | linux | linux  |
//! | `//extra:extra_toolchain_mac`     | mac   | linux  |
//! | `//toolchain:toolchain_1`         | linux | mac    |
//! | `//toolchain:toolchain_2`         | mac   | linux  |
//!
//! Only the `//toolchain` ones are registered in the workspace.

use std::collections::BTreeMap;
use std::path::Path;

use crate::core::package::BUILD_FILE_NAME;
use crate::core::workspace::WORKSPACE_FILE_NAME;
use crate::core::{BuildOptions, Label, PackageName, Registrations};
use crate::resolution::ToolchainGraph;
use crate::test_support::MemoryPackageLoader;

/// Fixture for a complete workspace.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceFixture {
    /// Package name -> BUILD.toml contents
    pub packages: BTreeMap<String, String>,
    pub registrations: Registrations,
}

impl WorkspaceFixture {
    /// Create an empty workspace fixture.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard workspace described in the module docs.
    pub fn standard() -> Self {
        WorkspaceFixture::new()
            .with_package("constraints", packages::CONSTRAINTS)
            .with_package("platforms", packages::PLATFORMS)
            .with_package("host", packages::HOST)
            .with_package("toolchain", packages::TOOLCHAIN)
            .with_package("extra", packages::EXTRA)
            .with_package("invalid", packages::INVALID)
            .with_package("sample", packages::SAMPLE)
            .with_package("fake/toolchain", packages::CONFLICTING)
            .with_registrations(standard_registrations())
    }

    pub fn with_package(mut self, name: &str, contents: impl Into<String>) -> Self {
        self.packages.insert(name.to_string(), contents.into());
        self
    }

    pub fn with_registrations(mut self, registrations: Registrations) -> Self {
        self.registrations = registrations;
        self
    }

    /// An in-memory loader serving this fixture's packages.
    pub fn loader(&self) -> MemoryPackageLoader {
        let loader = MemoryPackageLoader::new();
        for (name, contents) in &self.packages {
            loader.insert(name, contents.clone());
        }
        loader
    }

    /// Write `WORKSPACE.toml` and every `BUILD.toml` under `root`.
    pub fn write_to(&self, root: &Path) -> std::io::Result<()> {
        let workspace = toml::to_string(&self.registrations)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(root.join(WORKSPACE_FILE_NAME), workspace)?;

        for (name, contents) in &self.packages {
            let package = PackageName::new(name.as_str())
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
            let dir = root.join(package.relative_dir());
            std::fs::create_dir_all(&dir)?;
            std::fs::write(dir.join(BUILD_FILE_NAME), contents)?;
        }
        Ok(())
    }
}

fn label(s: &str) -> Label {
    Label::parse(s).unwrap()
}

/// Loader for the standard workspace.
pub fn standard_loader() -> MemoryPackageLoader {
    WorkspaceFixture::standard().loader()
}

/// Registrations of the standard workspace.
pub fn standard_registrations() -> Registrations {
    Registrations {
        register_toolchains: vec![
            label("//toolchain:toolchain_1"),
            label("//toolchain:toolchain_2"),
        ],
        register_execution_platforms: vec![label("//platforms:mac"), label("//platforms:linux")],
    }
}

/// Host `//host:host`, target `//platforms:linux`, both extra toolchains.
pub fn standard_options() -> BuildOptions {
    BuildOptions::for_host(label("//host:host"))
        .with_target_platform(label("//platforms:linux"))
        .with_extra_toolchains(vec![
            label("//extra:extra_toolchain_linux"),
            label("//extra:extra_toolchain_mac"),
        ])
}

/// A graph over the standard workspace.
pub fn standard_graph() -> ToolchainGraph {
    let fixture = WorkspaceFixture::standard();
    ToolchainGraph::new(fixture.loader(), fixture.registrations)
}

/// BUILD.toml contents of the standard workspace.
pub mod packages {
    pub const CONSTRAINTS: &str = r#"
[[constraint_setting]]
name = "os"

[[constraint_value]]
name = "linux"
constraint_setting = ":os"

[[constraint_value]]
name = "mac"
constraint_setting = ":os"
"#;

    pub const PLATFORMS: &str = r#"
[[platform]]
name = "linux"
constraint_values = ["//constraints:linux"]

[[platform]]
name = "mac"
constraint_values = ["//constraints:mac"]
"#;

    pub const HOST: &str = r#"
[[platform]]
name = "host"
"#;

    pub const TOOLCHAIN: &str = r#"
[[toolchain_type]]
name = "test_toolchain"

[[toolchain]]
name = "toolchain_1"
toolchain_type = ":test_toolchain"
exec_compatible_with = ["//constraints:linux"]
target_compatible_with = ["//constraints:mac"]
toolchain = ":toolchain_1_impl"

[[toolchain]]
name = "toolchain_2"
toolchain_type = ":test_toolchain"
exec_compatible_with = ["//constraints:mac"]
target_compatible_with = ["//constraints:linux"]
toolchain = ":toolchain_2_impl"

[[rule]]
kind = "filegroup"
name = "toolchain_1_impl"

[[rule]]
kind = "filegroup"
name = "toolchain_2_impl"
"#;

    pub const EXTRA: &str = r#"
[[toolchain]]
name = "extra_toolchain_linux"
toolchain_type = "//toolchain:test_toolchain"
exec_compatible_with = ["//constraints:linux"]
target_compatible_with = ["//constraints:linux"]
toolchain = ":extra_toolchain_linux_impl"

[[toolchain]]
name = "extra_toolchain_mac"
toolchain_type = "//toolchain:test_toolchain"
exec_compatible_with = ["//constraints:mac"]
target_compatible_with = ["//constraints:linux"]
toolchain = ":extra_toolchain_mac_impl"

[[rule]]
kind = "filegroup"
name = "extra_toolchain_linux_impl"

[[rule]]
kind = "filegroup"
name = "extra_toolchain_mac_impl"
"#;

    pub const INVALID: &str = r#"
[[rule]]
kind = "filegroup"
name = "not_a_platform"
"#;

    pub const SAMPLE: &str = r#"
[[constraint_setting]]
name = "demo"

[[constraint_value]]
name = "demo_a"
constraint_setting = ":demo"

[[constraint_value]]
name = "demo_b"
constraint_setting = ":demo"

[[platform]]
name = "sample_a"
constraint_values = [":demo_a"]

[[platform]]
name = "sample_b"
constraint_values = [":demo_b"]
"#;

    /// Two types that resolve alone but never on the same platform.
    pub const CONFLICTING: &str = r#"
[[toolchain_type]]
name = "type_a"

[[toolchain_type]]
name = "type_b"

[[toolchain]]
name = "a_on_mac"
toolchain_type = ":type_a"
exec_compatible_with = ["//constraints:mac"]
toolchain = ":a_impl"

[[toolchain]]
name = "b_on_linux"
toolchain_type = ":type_b"
exec_compatible_with = ["//constraints:linux"]
toolchain = ":b_impl"

[[rule]]
kind = "filegroup"
name = "a_impl"

[[rule]]
kind = "filegroup"
name = "b_impl"
"#;
}
