//! Platform descriptors.
//!
//! A platform is a named bundle of constraint values describing a machine
//! that runs build tools (an execution platform) or the machine the build
//! output is meant for (the target platform).

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::core::{ConstraintSetting, ConstraintValue, Label};

/// Error constructing a platform from its declared constraint values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error(
        "platform {platform} declares more than one value for constraint setting {setting}: {first} and {second}"
    )]
    DuplicateConstraint {
        platform: Label,
        setting: ConstraintSetting,
        first: Label,
        second: Label,
    },
}

/// A resolved platform: its label and at most one value per constraint setting.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformDescriptor {
    label: Label,
    #[serde(serialize_with = "serialize_values")]
    constraints: BTreeMap<ConstraintSetting, ConstraintValue>,
}

impl PlatformDescriptor {
    /// Build a platform, rejecting two values for the same setting.
    pub fn new(
        label: Label,
        values: impl IntoIterator<Item = ConstraintValue>,
    ) -> Result<Self, PlatformError> {
        let mut constraints = BTreeMap::new();
        for value in values {
            if let Some(existing) = constraints.insert(value.setting(), value) {
                if existing != value {
                    return Err(PlatformError::DuplicateConstraint {
                        platform: label,
                        setting: value.setting(),
                        first: existing.label(),
                        second: value.label(),
                    });
                }
            }
        }
        Ok(PlatformDescriptor { label, constraints })
    }

    pub fn label(&self) -> Label {
        self.label
    }

    /// Declared constraint values, ordered by setting.
    pub fn constraints(&self) -> impl Iterator<Item = &ConstraintValue> {
        self.constraints.values()
    }

    /// The value this platform declares for `setting`, if any.
    pub fn get(&self, setting: ConstraintSetting) -> Option<&ConstraintValue> {
        self.constraints.get(&setting)
    }

    /// Whether this platform declares exactly `value` for its setting.
    ///
    /// A platform that says nothing about the setting does not satisfy it.
    pub fn has(&self, value: &ConstraintValue) -> bool {
        self.get(value.setting()) == Some(value)
    }

    /// Whether this platform satisfies every value in `required`.
    pub fn satisfies<'a>(&self, required: impl IntoIterator<Item = &'a ConstraintValue>) -> bool {
        required.into_iter().all(|value| self.has(value))
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.label, f)
    }
}

fn serialize_values<S>(
    constraints: &BTreeMap<ConstraintSetting, ConstraintValue>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(constraints.values().map(|v| v.label()))
}
