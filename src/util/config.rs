//! Configuration file support for Quay.
//!
//! Quay supports two configuration file locations:
//! - Global: `~/.quay/config.toml` - User-wide defaults
//! - Project: `.quay/config.toml` - Workspace-specific overrides
//!
//! Project config takes precedence over global config; command-line flags
//! take precedence over both.
//!
//! ```toml
//! [resolution]
//! keep_going = true
//! jobs = 8
//!
//! [platforms]
//! host_platform = "//host:host"
//! platforms = "//platforms:linux"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::Label;

/// Quay configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Evaluation settings
    pub resolution: ResolutionConfig,

    /// Default platforms
    pub platforms: PlatformsConfig,
}

/// Evaluation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Keep evaluating after the first error (None = fail fast)
    pub keep_going: Option<bool>,

    /// Number of worker threads (None = one per CPU)
    pub jobs: Option<usize>,
}

/// Default host and target platforms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformsConfig {
    /// Platform the build runs on
    pub host_platform: Option<Label>,

    /// Platform to build for (None = the host platform)
    pub platforms: Option<Label>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.resolution.keep_going.is_some() {
            self.resolution.keep_going = other.resolution.keep_going;
        }
        if other.resolution.jobs.is_some() {
            self.resolution.jobs = other.resolution.jobs;
        }

        if other.platforms.host_platform.is_some() {
            self.platforms.host_platform = other.platforms.host_platform;
        }
        if other.platforms.platforms.is_some() {
            self.platforms.platforms = other.platforms.platforms;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.quay/config.toml)
/// 2. Global config (~/.quay/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    // Project config overrides global
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global quay config directory (~/.quay).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".quay"))
}

/// Get the global config path (~/.quay/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.quay/config.toml).
pub fn project_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".quay").join("config.toml")
}
