//! The node function of the toolchain resolution graph.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::{BuildOptions, ConfigurationKey, Label, Package, PackageName, Registrations};
use crate::engine::{Env, NodeError, NodeFunction, NodeResult};
use crate::resolution::keys::{NodeKey, NodeValue};
use crate::resolution::loader::PackageLoader;
use crate::resolution::{context, registry, ToolchainError};

/// Environment handed to the resolution node functions.
pub type GraphEnv<'a> = Env<'a, ToolchainGraph>;

/// Outcome of a lookup that may need to wait for other nodes.
pub type Lookup<T> = Result<Option<T>, NodeError<ToolchainError>>;

/// Parsed packages, by name.
pub type Packages = HashMap<PackageName, Arc<Package>>;

/// Computes every node of the resolution graph.
///
/// Workspace registrations and the loader are fixed for the lifetime of the
/// graph. Build options are registered up front and referred to by their
/// configuration key.
pub struct ToolchainGraph {
    loader: Box<dyn PackageLoader>,
    registrations: Registrations,
    configurations: RwLock<HashMap<ConfigurationKey, Arc<BuildOptions>>>,
}

impl ToolchainGraph {
    pub fn new(loader: impl PackageLoader + 'static, registrations: Registrations) -> Self {
        ToolchainGraph {
            loader: Box::new(loader),
            registrations,
            configurations: RwLock::new(HashMap::new()),
        }
    }

    pub fn registrations(&self) -> &Registrations {
        &self.registrations
    }

    /// Make `options` available to the graph and return its key.
    pub fn register_configuration(&self, options: BuildOptions) -> ConfigurationKey {
        let key = options.configuration_key();
        let mut configurations = self
            .configurations
            .write()
            .unwrap_or_else(|e| e.into_inner());
        configurations
            .entry(key.clone())
            .or_insert_with(|| Arc::new(options));
        key
    }

    fn load_package(&self, name: &PackageName) -> NodeResult<Self> {
        let package = self.loader.load(name)?;
        tracing::debug!("package {} declares {} target(s)", name, package.len());
        Ok(Some(NodeValue::Package(Arc::new(package))))
    }

    fn configuration(&self, key: &ConfigurationKey) -> NodeResult<Self> {
        let configurations = self.configurations.read().unwrap_or_else(|e| e.into_inner());
        match configurations.get(key) {
            Some(options) => Ok(Some(NodeValue::Configuration(Arc::clone(options)))),
            None => Err(ToolchainError::UnknownConfiguration(key.clone()).into()),
        }
    }
}

impl NodeFunction for ToolchainGraph {
    type Key = NodeKey;
    type Value = NodeValue;
    type Error = ToolchainError;

    fn compute(&self, key: &NodeKey, env: &mut GraphEnv<'_>) -> NodeResult<Self> {
        match key {
            NodeKey::Package(name) => self.load_package(name),
            NodeKey::Configuration(config) => self.configuration(config),
            NodeKey::RegisteredExecutionPlatforms(config) => {
                Ok(registry::execution_platforms(env, config, &self.registrations)?
                    .map(|platforms| NodeValue::ExecutionPlatforms(Arc::new(platforms))))
            }
            NodeKey::RegisteredToolchains(config) => {
                Ok(registry::toolchains(env, config, &self.registrations)?
                    .map(|toolchains| NodeValue::Toolchains(Arc::new(toolchains))))
            }
            NodeKey::ToolchainContext(key) => Ok(context::compute(env, key)?
                .map(|context| NodeValue::ToolchainContext(Arc::new(context)))),
        }
    }

    fn cycle_error(&self, key: &NodeKey, cycle: &[NodeKey]) -> ToolchainError {
        ToolchainError::Cycle {
            key: key.to_string(),
            cycle: cycle.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn incomplete_error(&self, key: &NodeKey) -> ToolchainError {
        ToolchainError::Incomplete {
            key: key.to_string(),
        }
    }
}

/// Request the packages declaring `labels`.
///
/// Every package is requested before anything is returned. On failure the
/// error comes with the index of the first label whose package failed.
pub(crate) fn request_packages(
    env: &mut GraphEnv<'_>,
    labels: &[Label],
) -> Result<Option<Packages>, (usize, NodeError<ToolchainError>)> {
    let mut packages = HashMap::new();
    let mut first_error = None;
    let mut missing = false;

    for (i, label) in labels.iter().enumerate() {
        let name = label.package();
        if packages.contains_key(name) {
            continue;
        }
        match env.get(NodeKey::Package(name.clone())) {
            Ok(Some(NodeValue::Package(package))) => {
                packages.insert(name.clone(), package);
            }
            Ok(Some(other)) => unexpected(&other),
            Ok(None) => missing = true,
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some((i, e));
                }
            }
        }
    }

    match first_error {
        Some(failure) => Err(failure),
        None if missing => Ok(None),
        None => Ok(Some(packages)),
    }
}

pub(crate) fn request_configuration(
    env: &mut GraphEnv<'_>,
    key: &ConfigurationKey,
) -> Lookup<Arc<BuildOptions>> {
    match env.get(NodeKey::Configuration(key.clone()))? {
        Some(NodeValue::Configuration(options)) => Ok(Some(options)),
        Some(other) => unexpected(&other),
        None => Ok(None),
    }
}

pub(crate) fn unexpected(value: &NodeValue) -> ! {
    unreachable!("node produced a value of the wrong kind: {:?}", value)
}
