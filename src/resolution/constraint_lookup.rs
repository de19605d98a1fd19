//! Resolving constraint value labels.

use crate::core::{ConstraintSetting, ConstraintValue, Definition, Label};
use crate::engine::NodeError;
use crate::resolution::functions::{request_packages, GraphEnv, Lookup};
use crate::resolution::{InvalidReason, ToolchainError};

fn invalid(label: Label, reason: InvalidReason) -> ToolchainError {
    ToolchainError::InvalidConstraintValue { label, reason }
}

/// Resolve `labels` to constraint values, in the same order.
///
/// Every label must name a `constraint_value` whose setting names a
/// `constraint_setting`. Waits for the packages of both.
pub fn constraint_values(env: &mut GraphEnv<'_>, labels: &[Label]) -> Lookup<Vec<ConstraintValue>> {
    if labels.is_empty() {
        return Ok(Some(Vec::new()));
    }

    let packages = match request_packages(env, labels) {
        Ok(Some(packages)) => packages,
        Ok(None) => return Ok(None),
        Err((i, e)) => return Err(e.map(|err| invalid(labels[i], InvalidReason::cause(err.clone())))),
    };

    let mut settings = Vec::with_capacity(labels.len());
    for &label in labels {
        match packages[label.package()].get(label.name()) {
            Some(Definition::ConstraintValue { setting }) => settings.push(*setting),
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

    let setting_packages = match request_packages(env, &settings) {
        Ok(Some(packages)) => packages,
        Ok(None) => return Ok(None),
        Err((i, e)) => return Err(e.map(|err| invalid(labels[i], InvalidReason::cause(err.clone())))),
    };

    let mut values = Vec::with_capacity(labels.len());
    for (&label, &setting) in labels.iter().zip(&settings) {
        match setting_packages[setting.package()].get(setting.name()) {
            Some(Definition::ConstraintSetting) => {
                values.push(ConstraintValue::new(label, ConstraintSetting::new(setting)));
            }
            Some(other) => {
                let reason = InvalidReason::Malformed(format!(
                    "its setting {} is a {}, not a constraint_setting",
                    setting,
                    other.kind_name()
                ));
                return Err(NodeError::persistent(invalid(label, reason)));
            }
            None => {
                let reason = InvalidReason::cause(ToolchainError::NoSuchTarget { label: setting });
                return Err(NodeError::persistent(invalid(label, reason)));
            }
        }
    }

    Ok(Some(values))
}
