//! Constraint settings and values.
//!
//! A constraint setting names an axis of variation (for example the OS
//! family). A constraint value is one point on that axis and always belongs
//! to exactly one setting.

use std::fmt;

use serde::Serialize;

use crate::core::Label;

/// An axis of environment variation, declared by a `constraint_setting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConstraintSetting {
    label: Label,
}

impl ConstraintSetting {
    pub fn new(label: Label) -> Self {
        ConstraintSetting { label }
    }

    pub fn label(&self) -> Label {
        self.label
    }
}

impl fmt::Display for ConstraintSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.label, f)
    }
}

/// One value of a constraint setting, declared by a `constraint_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConstraintValue {
    label: Label,
    setting: ConstraintSetting,
}

impl ConstraintValue {
    pub fn new(label: Label, setting: ConstraintSetting) -> Self {
        ConstraintValue { label, setting }
    }

    pub fn label(&self) -> Label {
        self.label
    }

    /// The setting this value belongs to.
    pub fn setting(&self) -> ConstraintSetting {
        self.setting
    }
}

impl fmt::Display for ConstraintValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.label, f)
    }
}

/// Render a list of constraint values as `a, b, c`, or `(none)` when empty.
pub fn describe_constraints<'a>(values: impl IntoIterator<Item = &'a ConstraintValue>) -> String {
    let rendered: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
    if rendered.is_empty() {
        "(none)".to_string()
    } else {
        rendered.join(", ")
    }
}
