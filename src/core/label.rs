//! Labels - hierarchical identifiers for build definitions.
//!
//! A label has the form `//package/path:name`. Platforms, constraint
//! settings and values, toolchain types and toolchains are all referenced
//! by label. Labels are interned so that cloning is free and equality is a
//! pointer comparison.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::{LazyLock, RwLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Global label interner
static LABEL_INTERNER: LazyLock<RwLock<HashMap<LabelInner, &'static LabelInner>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Error produced when label text cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid label `{text}`: {reason}")]
pub struct LabelError {
    pub text: String,
    pub reason: &'static str,
}

impl LabelError {
    fn new(text: &str, reason: &'static str) -> Self {
        LabelError {
            text: text.to_string(),
            reason,
        }
    }
}

/// The package part of a label (`a/b` in `//a/b:c`).
///
/// A package maps onto a directory of the workspace that holds a `BUILD.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Create a package name, validating each path segment.
    pub fn new(name: impl Into<String>) -> Result<Self, LabelError> {
        let name = name.into();
        validate_package(&name).map_err(|reason| LabelError::new(&name, reason))?;
        Ok(PackageName(name))
    }

    /// The root package (`//`).
    pub fn root() -> Self {
        PackageName(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory of this package relative to the workspace root.
    pub fn relative_dir(&self) -> PathBuf {
        self.0.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Last path segment, used as the implicit target name of `//pkg`.
    fn last_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LabelInner {
    package: PackageName,
    name: String,
}

/// An interned label.
#[derive(Clone, Copy)]
pub struct Label {
    inner: &'static LabelInner,
}

impl Label {
    /// Create a label from an already validated package and a target name.
    pub fn new(package: PackageName, name: impl Into<String>) -> Result<Self, LabelError> {
        let name = name.into();
        validate_name(&name).map_err(|reason| {
            LabelError::new(&format!("{}:{}", package, name), reason)
        })?;
        Ok(Self::intern(LabelInner { package, name }))
    }

    /// Parse an absolute label: `//pkg:name` or `//pkg` (short for `//pkg:pkg`).
    pub fn parse(text: &str) -> Result<Self, LabelError> {
        let rest = text
            .strip_prefix("//")
            .ok_or_else(|| LabelError::new(text, "labels must start with `//`"))?;

        let (package, name) = match rest.split_once(':') {
            Some((package, name)) => (package, name.to_string()),
            None => {
                if rest.is_empty() {
                    return Err(LabelError::new(text, "missing target name"));
                }
                let package = PackageName::new(rest)
                    .map_err(|e| LabelError::new(text, e.reason))?;
                let name = package.last_segment().to_string();
                return Label::new(package, name).map_err(|e| LabelError::new(text, e.reason));
            }
        };

        let package = PackageName::new(package).map_err(|e| LabelError::new(text, e.reason))?;
        Label::new(package, name).map_err(|e| LabelError::new(text, e.reason))
    }

    /// Parse a label that may be relative to `base` (`:name` or a bare `name`).
    pub fn parse_relative(text: &str, base: &PackageName) -> Result<Self, LabelError> {
        if text.starts_with("//") {
            return Label::parse(text);
        }
        let name = text.strip_prefix(':').unwrap_or(text);
        Label::new(base.clone(), name).map_err(|e| LabelError::new(text, e.reason))
    }

    fn intern(inner: LabelInner) -> Self {
        {
            let interner = LABEL_INTERNER.read().unwrap_or_else(|e| e.into_inner());
            if let Some(&interned) = interner.get(&inner) {
                return Label { inner: interned };
            }
        }

        let mut interner = LABEL_INTERNER.write().unwrap_or_else(|e| e.into_inner());

        // Another thread may have won the race between the two locks
        if let Some(&interned) = interner.get(&inner) {
            return Label { inner: interned };
        }

        let leaked: &'static LabelInner = Box::leak(Box::new(inner.clone()));
        interner.insert(inner, leaked);

        Label { inner: leaked }
    }

    /// The package this label belongs to.
    pub fn package(&self) -> &'static PackageName {
        &self.inner.package
    }

    /// The target name within the package.
    pub fn name(&self) -> &'static str {
        &self.inner.name
    }
}

fn validate_package(package: &str) -> Result<(), &'static str> {
    if package.is_empty() {
        return Ok(());
    }
    if package.starts_with('/') || package.ends_with('/') {
        return Err("package path must not start or end with `/`");
    }
    for segment in package.split('/') {
        if segment.is_empty() {
            return Err("package path contains an empty segment");
        }
        if segment == "." || segment == ".." {
            return Err("package path must not contain `.` or `..` segments");
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err("package path contains an invalid character");
        }
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("missing target name");
    }
    if name.contains(':') {
        return Err("target name must not contain `:`");
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("target name contains whitespace");
    }
    Ok(())
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.inner, other.inner)
    }
}

impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.inner, state)
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by package, then by name.
impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner
            .package
            .cmp(&other.inner.package)
            .then_with(|| self.inner.name.cmp(&other.inner.name))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}:{}", self.inner.package.as_str(), self.inner.name)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({})", self)
    }
}

impl std::str::FromStr for Label {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::parse(s)
    }
}

impl Serialize for Label {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Label::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute() {
        let label = Label::parse("//platforms:linux").unwrap();
        assert_eq!(label.package().as_str(), "platforms");
        assert_eq!(label.name(), "linux");
        assert_eq!(label.to_string(), "//platforms:linux");
    }

    #[test]
    fn test_parse_nested_package() {
        let label = Label::parse("//fake/toolchain:type_1").unwrap();
        assert_eq!(label.package().as_str(), "fake/toolchain");
        assert_eq!(label.package().relative_dir(), PathBuf::from("fake/toolchain"));
    }

    #[test]
    fn test_parse_shorthand() {
        let label = Label::parse("//tools/cc").unwrap();
        assert_eq!(label, Label::parse("//tools/cc:cc").unwrap());
    }

    #[test]
    fn test_parse_root_package() {
        let label = Label::parse("//:host").unwrap();
        assert_eq!(label.package(), &PackageName::root());
        assert_eq!(label.to_string(), "//:host");
    }

    #[test]
    fn test_parse_relative() {
        let base = PackageName::new("sample").unwrap();
        assert_eq!(
            Label::parse_relative(":demo_a", &base).unwrap(),
            Label::parse("//sample:demo_a").unwrap()
        );
        assert_eq!(
            Label::parse_relative("demo_b", &base).unwrap(),
            Label::parse("//sample:demo_b").unwrap()
        );
        assert_eq!(
            Label::parse_relative("//constraints:linux", &base).unwrap(),
            Label::parse("//constraints:linux").unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in ["platforms:linux", "//", "//a//b:c", "//a:", "//a/../b:c", "//a:b c"] {
            let err = Label::parse(text).unwrap_err();
            assert_eq!(err.text, text);
        }
    }

    #[test]
    fn test_interning() {
        let a = Label::parse("//constraints:mac").unwrap();
        let b = Label::parse("//constraints:mac").unwrap();
        assert!(std::ptr::eq(a.inner, b.inner));
    }

    #[test]
    fn test_ordering_is_package_then_name() {
        let mut labels = vec![
            Label::parse("//b:a").unwrap(),
            Label::parse("//a/b:c").unwrap(),
            Label::parse("//a:z").unwrap(),
            Label::parse("//a:b").unwrap(),
        ];
        labels.sort();
        let rendered: Vec<_> = labels.iter().map(|l| l.to_string()).collect();
        // `//a` sorts before `//a/b` even though `/` < `:` in the text
        assert_eq!(rendered, vec!["//a:b", "//a:z", "//a/b:c", "//b:a"]);
    }

    #[test]
    fn test_serde_round_trip_through_toml() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            label: Label,
        }

        let parsed: Wrapper = toml::from_str("label = \"//x:y\"").unwrap();
        assert_eq!(parsed.label.to_string(), "//x:y");
        assert!(toml::from_str::<Wrapper>("label = \"x:y\"").is_err());
    }
}
