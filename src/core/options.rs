//! Build options - the platform and toolchain flags of one build invocation.
//!
//! A [`BuildOptions`] value is the build configuration as far as toolchain
//! resolution is concerned. Its [`ConfigurationKey`] is a content hash, so
//! two invocations with the same flags share memoized results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Label;
use crate::util::hash::Fingerprint;

/// Platform and toolchain flags (`--host_platform`, `--platforms`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// The platform the build tool itself runs on; first execution candidate.
    pub host_platform: Label,

    /// The platform build outputs are produced for.
    pub target_platform: Label,

    /// Execution platforms given on the command line, ahead of registered ones.
    #[serde(default)]
    pub extra_execution_platforms: Vec<Label>,

    /// Toolchains given on the command line, ahead of registered ones.
    #[serde(default)]
    pub extra_toolchains: Vec<Label>,
}

impl BuildOptions {
    /// Options where the target platform is the host platform.
    pub fn for_host(host_platform: Label) -> Self {
        BuildOptions {
            host_platform,
            target_platform: host_platform,
            extra_execution_platforms: Vec::new(),
            extra_toolchains: Vec::new(),
        }
    }

    pub fn with_target_platform(mut self, target_platform: Label) -> Self {
        self.target_platform = target_platform;
        self
    }

    pub fn with_extra_execution_platforms(mut self, platforms: Vec<Label>) -> Self {
        self.extra_execution_platforms = platforms;
        self
    }

    pub fn with_extra_toolchains(mut self, toolchains: Vec<Label>) -> Self {
        self.extra_toolchains = toolchains;
        self
    }

    /// Identity of this configuration.
    pub fn configuration_key(&self) -> ConfigurationKey {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.host_platform.to_string())
            .update_str(&self.target_platform.to_string())
            .update_list(self.extra_execution_platforms.iter().map(|l| l.to_string()))
            .update_list(self.extra_toolchains.iter().map(|l| l.to_string()));
        ConfigurationKey(fp.finish())
    }
}

/// Content hash identifying a [`BuildOptions`] value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConfigurationKey(String);

impl ConfigurationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigurationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form, like a commit hash
        write!(f, "{}", &self.0[..self.0.len().min(12)])
    }
}
