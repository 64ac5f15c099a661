//! Labels - identifiers for build targets.
//!
//! A Label names exactly one target: an optional external repository,
//! a workspace-relative package path and a target name. Labels compare
//! by their normalized string form (`@repo//pkg/path:name`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Prefix marking an absolute label.
pub const ROOT_SLASHES: &str = "//";

/// Target names that expand to more than one target.
const WILDCARD_NAMES: &[&str] = &["all", "*", "all-targets"];

/// Error produced when a string is not a valid concrete label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("label `{0}` is empty")]
    Empty(String),

    #[error("label `{0}` must be absolute (start with `//` or `@repo//`)")]
    NotAbsolute(String),

    #[error("label `{0}` has an empty target name")]
    EmptyName(String),

    #[error("label `{0}` is a wildcard, a single concrete target is required")]
    NotConcrete(String),

    #[error("label `{label}` contains invalid package path `{package}`")]
    InvalidPackage { label: String, package: String },
}

/// A concrete target identifier.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    /// Normalized `@repo//pkg:name` form, used for equality and ordering
    canonical: String,

    /// Byte offset where the package path starts in `canonical`
    package_start: usize,

    /// Byte offset of the `:` separating package and name
    colon: usize,
}

impl Label {
    /// Parse a label, rejecting wildcard and malformed forms.
    pub fn parse(s: &str) -> Result<Self, LabelError> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(LabelError::Empty(s.to_string()));
        }

        // `@@repo` is the canonical repository spelling, `@repo` the apparent one
        let (repo, rest) = if let Some(stripped) = raw.strip_prefix('@') {
            let stripped = stripped.trim_start_matches('@');
            match stripped.find(ROOT_SLASHES) {
                Some(idx) => (Some(&stripped[..idx]), &stripped[idx..]),
                None => return Err(LabelError::NotAbsolute(raw.to_string())),
            }
        } else {
            (None, raw)
        };

        let rest = rest
            .strip_prefix(ROOT_SLASHES)
            .ok_or_else(|| LabelError::NotAbsolute(raw.to_string()))?;

        let (package, name) = match rest.split_once(':') {
            Some((package, name)) => (package, name.to_string()),
            None => {
                let last = rest.rsplit('/').next().unwrap_or_default();
                if last.is_empty() {
                    return Err(LabelError::EmptyName(raw.to_string()));
                }
                (rest, last.to_string())
            }
        };

        if package.split('/').any(|seg| seg == "...") || WILDCARD_NAMES.contains(&name.as_str()) {
            return Err(LabelError::NotConcrete(raw.to_string()));
        }
        if name.is_empty() {
            return Err(LabelError::EmptyName(raw.to_string()));
        }
        if !is_valid_package(package) {
            return Err(LabelError::InvalidPackage {
                label: raw.to_string(),
                package: package.to_string(),
            });
        }

        Ok(Label::from_parts(repo.filter(|r| !r.is_empty()), package, &name))
    }

    fn from_parts(repo: Option<&str>, package: &str, name: &str) -> Self {
        let mut canonical = String::new();
        if let Some(repo) = repo {
            canonical.push('@');
            canonical.push_str(repo);
        }
        canonical.push_str(ROOT_SLASHES);
        let package_start = canonical.len();
        canonical.push_str(package);
        let colon = canonical.len();
        canonical.push(':');
        canonical.push_str(name);

        Label {
            canonical,
            package_start,
            colon,
        }
    }

    /// Build a label for `name` inside the main-repository package `package`.
    pub fn new(package: &str, name: &str) -> Result<Self, LabelError> {
        Label::parse(&format!("//{}:{}", package, name))
    }

    /// The external repository name, if any.
    pub fn repository(&self) -> Option<&str> {
        if self.canonical.starts_with('@') {
            Some(&self.canonical[1..self.package_start - ROOT_SLASHES.len()])
        } else {
            None
        }
    }

    /// Whether this label lives outside the main workspace repository.
    pub fn is_external(&self) -> bool {
        self.repository().is_some()
    }

    /// Workspace-relative package path (no leading slashes).
    pub fn package(&self) -> &str {
        &self.canonical[self.package_start..self.colon]
    }

    /// Target name within the package.
    pub fn name(&self) -> &str {
        &self.canonical[self.colon + 1..]
    }

    /// The package label (`//pkg/path`), including the repository if external.
    pub fn package_label(&self) -> String {
        self.canonical[..self.colon].to_string()
    }

    /// Normalized string form.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

fn is_valid_package(package: &str) -> bool {
    if package.is_empty() {
        return true;
    }
    !package.starts_with('/')
        && !package.ends_with('/')
        && package
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({})", self.canonical)
    }
}

impl FromStr for Label {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::parse(s)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Label::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Validate a package scope such as `//foo/bar` and return it without the leading slashes.
pub fn parse_package_scope(scope: &str) -> Result<String, LabelError> {
    let trimmed = scope.trim();
    let rest = trimmed
        .strip_prefix(ROOT_SLASHES)
        .ok_or_else(|| LabelError::NotAbsolute(trimmed.to_string()))?;
    let rest = rest.trim_end_matches('/');

    if rest.contains(':') || rest.split('/').any(|seg| seg == "...") {
        return Err(LabelError::NotConcrete(trimmed.to_string()));
    }
    if !is_valid_package(rest) {
        return Err(LabelError::InvalidPackage {
            label: trimmed.to_string(),
            package: rest.to_string(),
        });
    }
    Ok(rest.to_string())
}
