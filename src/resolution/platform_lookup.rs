//! Resolving platform labels to platform descriptors.

use crate::core::{Definition, Label, PlatformDescriptor};
use crate::engine::NodeError;
use crate::resolution::constraint_lookup::constraint_values;
use crate::resolution::functions::{request_packages, GraphEnv, Lookup};
use crate::resolution::{InvalidReason, ToolchainError};

fn invalid(label: Label, reason: InvalidReason) -> ToolchainError {
    ToolchainError::InvalidPlatform { label, reason }
}

/// Resolve `labels` to platform descriptors, in the same order.
///
/// A label that names anything but a `platform` is an invalid platform, as
/// is a platform whose constraint values cannot be resolved.
pub fn platforms(env: &mut GraphEnv<'_>, labels: &[Label]) -> Lookup<Vec<PlatformDescriptor>> {
    let packages = match request_packages(env, labels) {
        Ok(Some(packages)) => packages,
        Ok(None) => return Ok(None),
        Err((i, e)) => {
            return Err(e.map(|err| invalid(labels[i], InvalidReason::cause(err.clone()))))
        }
    };

    let mut declared = Vec::with_capacity(labels.len());
    for &label in labels {
        match packages[label.package()].get(label.name()) {
            Some(Definition::Platform { constraint_values }) => {
                declared.push((label, constraint_values.as_slice()))
            }
            Some(other) => {
                let reason = InvalidReason::WrongKind {
                    found: other.kind_name(),
                };
                return Err(NodeError::persistent(invalid(label, reason)));
            }
            None => {
                let reason = InvalidReason::cause(ToolchainError::NoSuchTarget { label });
                return Err(NodeError::persistent(invalid(label, reason)));
            }
        }
    }

    // Request the constraints of every platform before giving up on a miss
    let mut resolved = Vec::with_capacity(declared.len());
    let mut missing = false;
    for &(label, values) in &declared {
        match constraint_values(env, values) {
            Ok(Some(values)) => resolved.push((label, values)),
            Ok(None) => missing = true,
            Err(e) => return Err(e.map(|err| invalid(label, InvalidReason::cause(err.clone())))),
        }
    }
    if missing {
        return Ok(None);
    }

    resolved
        .into_iter()
        .map(|(label, values)| {
            PlatformDescriptor::new(label, values).map_err(|e| {
                NodeError::persistent(invalid(label, InvalidReason::Malformed(e.to_string())))
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Resolve a single platform label.
pub fn platform(env: &mut GraphEnv<'_>, label: Label) -> Lookup<PlatformDescriptor> {
    Ok(platforms(env, &[label])?.and_then(|mut platforms| platforms.pop()))
}
