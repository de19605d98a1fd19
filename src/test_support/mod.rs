//! Test utilities for Quay unit tests.
//!
//! Provides an in-memory package loader, a standard workspace fixture, and
//! helpers that drive a lookup through the evaluator until it settles.
//!
//! # Example
//!
//! ```rust,ignore
//! use quay::test_support::{evaluate_lookup, fixtures};
//!
//! #[test]
//! fn test_example() {
//!     let linux = evaluate_lookup(fixtures::standard_loader(), |env| {
//!         platform(env, Label::parse("//platforms:linux").unwrap())
//!     })
//!     .unwrap();
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use crate::core::{BuildOptions, ConfigurationKey, Label, Package, PackageName, Registrations};
use crate::engine::{EvaluationOptions, Evaluator};
use crate::resolution::{GraphEnv, Lookup, PackageLoader, ToolchainError, ToolchainGraph};

/// Package loader backed by in-memory `BUILD.toml` contents.
///
/// Clones share the same packages, so a test can keep a handle and edit
/// packages after handing a clone to a graph.
#[derive(Debug, Clone, Default)]
pub struct MemoryPackageLoader {
    packages: Arc<RwLock<HashMap<PackageName, String>>>,
    loads: Arc<Mutex<HashMap<PackageName, usize>>>,
}

impl MemoryPackageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package, builder style.
    pub fn with_package(self, name: &str, contents: impl Into<String>) -> Self {
        self.insert(name, contents);
        self
    }

    /// Add or replace a package.
    pub fn insert(&self, name: &str, contents: impl Into<String>) {
        let name = PackageName::new(name).unwrap();
        self.packages.write().unwrap().insert(name, contents.into());
    }

    /// Delete a package.
    pub fn remove(&self, name: &str) {
        let name = PackageName::new(name).unwrap();
        self.packages.write().unwrap().remove(&name);
    }

    /// How many times `name` was loaded.
    pub fn load_count(&self, name: &str) -> usize {
        let name = PackageName::new(name).unwrap();
        self.loads.lock().unwrap().get(&name).copied().unwrap_or(0)
    }
}

impl PackageLoader for MemoryPackageLoader {
    fn load(&self, package: &PackageName) -> Result<Package, ToolchainError> {
        *self.loads.lock().unwrap().entry(package.clone()).or_default() += 1;

        let packages = self.packages.read().unwrap();
        let contents = packages
            .get(package)
            .ok_or_else(|| ToolchainError::NoSuchPackage {
                package: package.clone(),
                dir: PathBuf::from(package.as_str()),
            })?;
        Ok(Package::parse(package.clone(), contents)?)
    }
}

/// Evaluate a lookup against `loader` with default registrations.
pub fn evaluate_lookup<T>(
    loader: MemoryPackageLoader,
    lookup: impl Fn(&mut GraphEnv<'_>) -> Lookup<T>,
) -> Result<T, ToolchainError> {
    evaluate_lookup_with(
        loader,
        Registrations::default(),
        BuildOptions::for_host(Label::parse("//host:host").unwrap()),
        |env, _, _| lookup(env),
    )
}

/// Evaluate a lookup, computing whatever it reports missing until it
/// produces a value or an error.
pub fn evaluate_lookup_with<T>(
    loader: MemoryPackageLoader,
    registrations: Registrations,
    options: BuildOptions,
    lookup: impl Fn(&mut GraphEnv<'_>, &ConfigurationKey, &Registrations) -> Lookup<T>,
) -> Result<T, ToolchainError> {
    let graph = ToolchainGraph::new(loader, registrations.clone());
    let config = graph.register_configuration(options);
    let evaluator = Evaluator::new(graph);

    for _ in 0..32 {
        let (result, missing) = evaluator.probe(|env| lookup(env, &config, &registrations));
        match result {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                // Failures surface on the next probe
                evaluator.evaluate(&missing, EvaluationOptions::keep_going());
            }
            Err(error) => return Err(error.error().clone()),
        }
    }
    panic!("lookup did not settle");
}

/// Assertion helpers
pub mod assertions {
    /// Assert that a result is an error whose message contains `expected`.
    pub fn assert_error_contains<T: std::fmt::Debug, E: std::fmt::Display>(
        result: Result<T, E>,
        expected: &str,
    ) {
        match result {
            Ok(value) => panic!("expected an error containing {:?}, got Ok({:?})", expected, value),
            Err(e) => {
                let message = e.to_string();
                assert!(
                    message.contains(expected),
                    "expected error containing {:?}, got: {}",
                    expected,
                    message
                );
            }
        }
    }
}
