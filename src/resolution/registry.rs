//! The registry view: execution candidates and registered toolchains.
//!
//! Labels given as build options come before labels registered in
//! `WORKSPACE.toml`. A label whose name is `all` expands to every
//! definition of the wanted kind in its package, in name order, unless the
//! package declares a target literally named `all`.

use std::collections::HashSet;

use crate::core::{
    BuildOptions, ConfigurationKey, Definition, DefinitionKind, Label, PlatformDescriptor,
    Registrations, ToolchainDescriptor,
};
use crate::engine::NodeError;
use crate::resolution::constraint_lookup::constraint_values;
use crate::resolution::functions::{request_configuration, request_packages, GraphEnv, Lookup};
use crate::resolution::platform_lookup::platforms;
use crate::resolution::{InvalidReason, ToolchainError};

/// Target name that expands to every definition of a package.
pub const ALL_TARGETS: &str = "all";

/// Execution platform labels in priority order: host first, then build
/// options, then workspace registrations. Later duplicates are dropped.
pub fn execution_candidate_labels(options: &BuildOptions, registrations: &Registrations) -> Vec<Label> {
    dedup(
        std::iter::once(options.host_platform)
            .chain(options.extra_execution_platforms.iter().copied())
            .chain(registrations.register_execution_platforms.iter().copied()),
    )
}

/// Toolchain labels in registration order.
pub fn toolchain_labels(options: &BuildOptions, registrations: &Registrations) -> Vec<Label> {
    dedup(
        options
            .extra_toolchains
            .iter()
            .chain(&registrations.register_toolchains)
            .copied(),
    )
}

fn dedup(labels: impl IntoIterator<Item = Label>) -> Vec<Label> {
    let mut seen = HashSet::new();
    labels.into_iter().filter(|l| seen.insert(*l)).collect()
}

/// Expand `:all` patterns in `labels`.
fn expand_patterns(
    env: &mut GraphEnv<'_>,
    labels: Vec<Label>,
    kind: DefinitionKind,
    invalid: fn(Label, InvalidReason) -> ToolchainError,
) -> Lookup<Vec<Label>> {
    let patterns: Vec<Label> = labels
        .iter()
        .copied()
        .filter(|l| l.name() == ALL_TARGETS)
        .collect();
    if patterns.is_empty() {
        return Ok(Some(labels));
    }

    let packages = match request_packages(env, &patterns) {
        Ok(Some(packages)) => packages,
        Ok(None) => return Ok(None),
        Err((i, e)) => {
            return Err(e.map(|err| invalid(patterns[i], InvalidReason::cause(err.clone()))))
        }
    };

    let mut expanded = Vec::new();
    for label in labels {
        match packages.get(label.package()) {
            Some(package) if label.name() == ALL_TARGETS && package.get(ALL_TARGETS).is_none() => {
                expanded.extend(
                    package
                        .definitions()
                        .filter(|(_, def)| def.kind() == kind)
                        .map(|(l, _)| l),
                );
            }
            _ => expanded.push(label),
        }
    }

    Ok(Some(dedup(expanded)))
}

fn invalid_platform(label: Label, reason: InvalidReason) -> ToolchainError {
    ToolchainError::InvalidPlatform { label, reason }
}

fn invalid_toolchain(label: Label, reason: InvalidReason) -> ToolchainError {
    ToolchainError::InvalidToolchain { label, reason }
}

/// Execution candidates of a configuration, in priority order.
pub fn execution_platforms(
    env: &mut GraphEnv<'_>,
    configuration: &ConfigurationKey,
    registrations: &Registrations,
) -> Lookup<Vec<PlatformDescriptor>> {
    let Some(options) = request_configuration(env, configuration)? else {
        return Ok(None);
    };

    let labels = execution_candidate_labels(&options, registrations);
    let Some(labels) = expand_patterns(env, labels, DefinitionKind::Platform, invalid_platform)?
    else {
        return Ok(None);
    };

    let candidates = platforms(env, &labels)?;
    if let Some(candidates) = &candidates {
        tracing::debug!(
            "execution candidates: {}",
            candidates
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(candidates)
}

/// Registered toolchains of a configuration, in registration order.
pub fn toolchains(
    env: &mut GraphEnv<'_>,
    configuration: &ConfigurationKey,
    registrations: &Registrations,
) -> Lookup<Vec<ToolchainDescriptor>> {
    let Some(options) = request_configuration(env, configuration)? else {
        return Ok(None);
    };

    let labels = toolchain_labels(&options, registrations);
    let Some(labels) = expand_patterns(env, labels, DefinitionKind::Toolchain, invalid_toolchain)?
    else {
        return Ok(None);
    };

    let packages = match request_packages(env, &labels) {
        Ok(Some(packages)) => packages,
        Ok(None) => return Ok(None),
        Err((i, e)) => {
            return Err(e.map(|err| invalid_toolchain(labels[i], InvalidReason::cause(err.clone()))))
        }
    };

    let mut declared = Vec::with_capacity(labels.len());
    for &label in &labels {
        match packages[label.package()].get(label.name()) {
            Some(Definition::Toolchain {
                toolchain_type,
                exec_compatible_with,
                target_compatible_with,
                implementation,
            }) => declared.push((
                label,
                *toolchain_type,
                exec_compatible_with.as_slice(),
                target_compatible_with.as_slice(),
                *implementation,
            )),
            Some(other) => {
                let reason = InvalidReason::WrongKind {
                    found: other.kind_name(),
                };
                return Err(NodeError::persistent(invalid_toolchain(label, reason)));
            }
            None => {
                let reason = InvalidReason::cause(ToolchainError::NoSuchTarget { label });
                return Err(NodeError::persistent(invalid_toolchain(label, reason)));
            }
        }
    }

    // Toolchain types must name toolchain_type declarations
    let types: Vec<Label> = declared.iter().map(|d| d.1).collect();
    let type_packages = match request_packages(env, &types) {
        Ok(Some(packages)) => Some(packages),
        Ok(None) => None,
        Err((i, e)) => {
            return Err(e.map(|err| {
                invalid_toolchain(declared[i].0, InvalidReason::cause(err.clone()))
            }))
        }
    };

    let mut descriptors = Vec::with_capacity(declared.len());
    let mut missing = type_packages.is_none();
    for &(label, toolchain_type, exec, target, implementation) in &declared {
        let wrap = |e: NodeError<ToolchainError>| {
            e.map(|err| invalid_toolchain(label, InvalidReason::cause(err.clone())))
        };
        let exec_constraints = constraint_values(env, exec).map_err(wrap)?;
        let target_constraints = constraint_values(env, target).map_err(wrap)?;

        if let Some(type_packages) = &type_packages {
            match type_packages[toolchain_type.package()].get(toolchain_type.name()) {
                Some(Definition::ToolchainType) => {}
                Some(other) => {
                    let reason = InvalidReason::Malformed(format!(
                        "its toolchain_type {} is a {}, not a toolchain_type",
                        toolchain_type,
                        other.kind_name()
                    ));
                    return Err(NodeError::persistent(invalid_toolchain(label, reason)));
                }
                None => {
                    let reason = InvalidReason::cause(ToolchainError::NoSuchTarget {
                        label: toolchain_type,
                    });
                    return Err(NodeError::persistent(invalid_toolchain(label, reason)));
                }
            }
        }

        match (exec_constraints, target_constraints) {
            (Some(exec_constraints), Some(target_constraints)) => {
                descriptors.push(ToolchainDescriptor {
                    label,
                    toolchain_type: toolchain_type.into(),
                    exec_constraints,
                    target_constraints,
                    implementation,
                })
            }
            _ => missing = true,
        }
    }

    if missing {
        return Ok(None);
    }

    tracing::debug!("{} registered toolchain(s)", descriptors.len());
    Ok(Some(descriptors))
}
