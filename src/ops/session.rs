//! A resolution session over one workspace.
//!
//! The session owns the evaluator, so results memoized by one call are
//! reused by the next. After a `BUILD.toml` changes, [`ResolutionSession::invalidate_package`]
//! drops the package and everything derived from it.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::core::{
    BuildOptions, ConfigurationKey, Label, PackageName, PlatformDescriptor, ToolchainContext,
    ToolchainDescriptor, Workspace,
};
use crate::engine::{EvaluationOptions, EvaluationStats, Evaluator};
use crate::resolution::{
    FsPackageLoader, NodeKey, NodeValue, PackageLoader, ToolchainContextKey, ToolchainError,
    ToolchainGraph,
};

/// One toolchain resolution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainRequest {
    /// Description of the requesting target, used in error messages
    pub target: String,
    pub toolchain_types: Vec<Label>,
    pub exec_constraints: Vec<Label>,
}

impl ToolchainRequest {
    pub fn new(target: impl Into<String>) -> Self {
        ToolchainRequest {
            target: target.into(),
            toolchain_types: Vec::new(),
            exec_constraints: Vec::new(),
        }
    }

    pub fn with_toolchain_types(mut self, types: impl IntoIterator<Item = Label>) -> Self {
        self.toolchain_types.extend(types);
        self
    }

    pub fn with_exec_constraints(mut self, constraints: impl IntoIterator<Item = Label>) -> Self {
        self.exec_constraints.extend(constraints);
        self
    }

    fn key(&self, configuration: ConfigurationKey) -> ToolchainContextKey {
        ToolchainContextKey::new(self.target.as_str(), configuration)
            .with_required_types(self.toolchain_types.iter().map(|&t| t.into()))
            .with_exec_constraints(self.exec_constraints.iter().copied())
    }
}

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Resolved(ToolchainContext),
    Failed(ToolchainError),
    /// Not evaluated because a fail-fast evaluation stopped at another error
    Skipped,
}

impl RequestOutcome {
    pub fn context(&self) -> Option<&ToolchainContext> {
        match self {
            RequestOutcome::Resolved(context) => Some(context),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ToolchainError> {
        match self {
            RequestOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Outcomes of a batch of requests, in request order.
#[derive(Debug, Clone)]
pub struct ResolveReport {
    pub outcomes: Vec<(ToolchainRequest, RequestOutcome)>,
    pub stats: EvaluationStats,
}

impl ResolveReport {
    /// Number of requests that did not resolve.
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !matches!(outcome, RequestOutcome::Resolved(_)))
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}

/// Evaluator state shared by successive operations on one workspace.
pub struct ResolutionSession {
    evaluator: Evaluator<ToolchainGraph>,
}

impl ResolutionSession {
    /// Session reading `BUILD.toml` files from the workspace directory.
    pub fn new(ws: &Workspace, jobs: Option<usize>) -> Self {
        Self::with_loader(ws, FsPackageLoader::new(ws.root()), jobs)
    }

    pub fn with_loader(
        ws: &Workspace,
        loader: impl PackageLoader + 'static,
        jobs: Option<usize>,
    ) -> Self {
        let graph = ToolchainGraph::new(loader, ws.registrations().clone());
        let evaluator = match jobs {
            Some(jobs) => Evaluator::new(graph).with_jobs(jobs),
            None => Evaluator::new(graph),
        };
        ResolutionSession { evaluator }
    }

    /// Resolve every request under `options`, in parallel.
    pub fn resolve(
        &self,
        options: BuildOptions,
        requests: &[ToolchainRequest],
        eval: EvaluationOptions,
    ) -> ResolveReport {
        let configuration = self.evaluator.function().register_configuration(options);
        let roots: Vec<NodeKey> = requests
            .iter()
            .map(|request| NodeKey::ToolchainContext(request.key(configuration.clone())))
            .collect();

        let result = self.evaluator.evaluate(&roots, eval);
        let stats = result.stats();
        tracing::info!(
            "evaluated {} request(s) in {} round(s) ({} computed, {} restarted)",
            requests.len(),
            stats.rounds,
            stats.computed,
            stats.restarts
        );

        let outcomes = requests
            .iter()
            .zip(&roots)
            .map(|(request, root)| {
                let outcome = match (result.get(root), result.error(root)) {
                    (Some(NodeValue::ToolchainContext(context)), _) => RequestOutcome::Resolved(
                        // Memoized under the first request with this identity
                        (**context)
                            .clone()
                            .with_target_description(request.target.as_str()),
                    ),
                    (_, Some(error)) => {
                        RequestOutcome::Failed(error.error().clone().in_target(request.target.as_str()))
                    }
                    _ => RequestOutcome::Skipped,
                };
                (request.clone(), outcome)
            })
            .collect();

        ResolveReport { outcomes, stats }
    }

    /// Execution platform candidates in priority order.
    pub fn execution_platforms(&self, options: BuildOptions) -> Result<Vec<PlatformDescriptor>> {
        let configuration = self.evaluator.function().register_configuration(options);
        match self.evaluate_registry(NodeKey::RegisteredExecutionPlatforms(configuration))? {
            NodeValue::ExecutionPlatforms(platforms) => Ok(unshare(platforms)),
            other => bail!("execution platforms evaluated to {:?}", other),
        }
    }

    /// Registered toolchains in priority order.
    pub fn registered_toolchains(&self, options: BuildOptions) -> Result<Vec<ToolchainDescriptor>> {
        let configuration = self.evaluator.function().register_configuration(options);
        match self.evaluate_registry(NodeKey::RegisteredToolchains(configuration))? {
            NodeValue::Toolchains(toolchains) => Ok(unshare(toolchains)),
            other => bail!("registered toolchains evaluated to {:?}", other),
        }
    }

    /// Forget `package` and every result derived from it.
    pub fn invalidate_package(&self, package: &PackageName) -> usize {
        let removed = self
            .evaluator
            .invalidate([NodeKey::Package(package.clone())]);
        tracing::debug!("invalidated {} node(s) for package {}", removed, package);
        removed
    }

    fn evaluate_registry(&self, key: NodeKey) -> Result<NodeValue> {
        let result = self
            .evaluator
            .evaluate(std::slice::from_ref(&key), EvaluationOptions::keep_going());
        if let Some(value) = result.get(&key) {
            return Ok(value.clone());
        }
        match result.error(&key) {
            Some(error) => Err(anyhow::Error::new(error.error().clone())),
            None => bail!("{} was not evaluated", key),
        }
    }
}

fn unshare<T: Clone>(values: Arc<Vec<T>>) -> Vec<T> {
    Arc::try_unwrap(values).unwrap_or_else(|shared| (*shared).clone())
}
