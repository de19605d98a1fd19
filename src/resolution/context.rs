//! The toolchain context node.
//!
//! Requests the target platform, the execution constraints, and the
//! registry view of the request's configuration. Nothing is resolved until
//! all of them are available; a restarted computation starts over and
//! produces the same context from the same inputs.

use crate::core::ToolchainContext;
use crate::engine::NodeError;
use crate::resolution::constraint_lookup::constraint_values;
use crate::resolution::functions::{request_configuration, unexpected, GraphEnv, Lookup};
use crate::resolution::keys::{NodeKey, NodeValue, ToolchainContextKey};
use crate::resolution::platform_lookup::platform;
use crate::resolution::resolve::{resolve, ResolutionRequest};
use crate::resolution::ToolchainError;

pub(crate) fn compute(env: &mut GraphEnv<'_>, key: &ToolchainContextKey) -> Lookup<ToolchainContext> {
    let Some(options) = request_configuration(env, key.configuration())? else {
        return Ok(None);
    };

    let exec_labels: Vec<_> = key.exec_constraints().iter().copied().collect();

    // Request everything before looking at any result
    let target = platform(env, options.target_platform);
    let exec_constraints = constraint_values(env, &exec_labels);
    let candidates = env.get(NodeKey::RegisteredExecutionPlatforms(key.configuration().clone()));
    let toolchains = if key.required_types().is_empty() {
        Ok(Some(NodeValue::Toolchains(Default::default())))
    } else {
        env.get(NodeKey::RegisteredToolchains(key.configuration().clone()))
    };

    let (Some(target), Some(exec_constraints), Some(candidates), Some(toolchains)) =
        (target?, exec_constraints?, candidates?, toolchains?)
    else {
        return Ok(None);
    };

    let candidates = match candidates {
        NodeValue::ExecutionPlatforms(candidates) => candidates,
        other => unexpected(&other),
    };
    let toolchains = match toolchains {
        NodeValue::Toolchains(toolchains) => toolchains,
        other => unexpected(&other),
    };

    let resolution = resolve(ResolutionRequest {
        target_platform: &target,
        required_types: key.required_types(),
        exec_constraints: &exec_constraints,
        candidates: &candidates,
        toolchains: &toolchains,
    })
    .map_err(NodeError::<ToolchainError>::persistent)?;

    tracing::debug!(
        "{}: execution platform {}, {} toolchain(s)",
        key.target_description(),
        resolution.execution_platform,
        resolution.resolved.len()
    );

    Ok(Some(ToolchainContext::new(
        key.target_description(),
        key.required_types().clone(),
        resolution.resolved,
        resolution.execution_platform,
        target,
    )))
}
