//! Target metadata records and the per-run store that holds them.
//!
//! A TargetInfo is produced by the metadata aspect for one target. Records
//! are immutable once ingested; the store keeps the latest record for each
//! label and remembers the order in which labels were first seen.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::label::Label;

/// Rule name prefixes of JVM rule sets. Rules outside these never put jars
/// on a classpath.
const JVM_RULE_PREFIXES: &[&str] = &[
    "java_",
    "kt_jvm_",
    "kt_android_",
    "scala_",
    "jvm_",
    "android_",
    "groovy_",
    "clojure_",
    "aar_",
];

/// The kind of target, derived from the rule kind string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// `*_library` rules
    #[default]
    Library,
    /// `*_import` rules wrapping prebuilt artifacts
    Import,
    /// `*_binary` rules
    Binary,
    /// `*_test` rules
    Test,
    /// Anything else, including non-JVM rules (filegroup, proto_library,
    /// cc_library, genrule, ...)
    Other(String),
}

impl TargetKind {
    /// Classify a rule kind string such as `java_library`.
    pub fn from_rule(kind: &str) -> Self {
        if !JVM_RULE_PREFIXES.iter().any(|prefix| kind.starts_with(prefix)) {
            TargetKind::Other(kind.to_string())
        } else if kind.ends_with("_library") {
            TargetKind::Library
        } else if kind.ends_with("_import") {
            TargetKind::Import
        } else if kind.ends_with("_binary") {
            TargetKind::Binary
        } else if kind.ends_with("_test") {
            TargetKind::Test
        } else {
            TargetKind::Other(kind.to_string())
        }
    }

    /// Check if this is a test target.
    pub fn is_test(&self) -> bool {
        matches!(self, TargetKind::Test)
    }

    /// Whether targets of this kind are expected to produce artifacts.
    pub fn produces_artifacts(&self) -> bool {
        !matches!(self, TargetKind::Other(_))
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Library => write!(f, "library"),
            TargetKind::Import => write!(f, "import"),
            TargetKind::Binary => write!(f, "binary"),
            TargetKind::Test => write!(f, "test"),
            TargetKind::Other(kind) => write!(f, "{}", kind),
        }
    }
}

impl Serialize for TargetKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TargetKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "library" => TargetKind::Library,
            "import" => TargetKind::Import,
            "binary" => TargetKind::Binary,
            "test" => TargetKind::Test,
            other => TargetKind::from_rule(other),
        })
    }
}

/// An output artifact of a target, relative to the execution root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JarOutput {
    /// Compiled artifact
    pub jar: PathBuf,

    /// Companion source artifact, if the rule produces one
    #[serde(default)]
    pub source_jar: Option<PathBuf>,
}

/// Metadata for a single target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    /// The target this record describes
    pub label: Label,

    /// Rule kind
    #[serde(default)]
    pub kind: TargetKind,

    /// Declared source files
    #[serde(default)]
    pub sources: Vec<PathBuf>,

    /// Compile-time dependencies
    #[serde(default)]
    pub deps: Vec<Label>,

    /// Runtime-only dependencies
    #[serde(default)]
    pub runtime_deps: Vec<Label>,

    /// Dependencies re-exported to consumers
    #[serde(default)]
    pub exports: Vec<Label>,

    /// Rule tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Output artifacts
    #[serde(default)]
    pub jars: Vec<JarOutput>,
}

impl TargetInfo {
    /// Create a record with no dependencies or outputs.
    pub fn new(label: Label, kind: TargetKind) -> Self {
        TargetInfo {
            label,
            kind,
            sources: Vec::new(),
            deps: Vec::new(),
            runtime_deps: Vec::new(),
            exports: Vec::new(),
            tags: Vec::new(),
            jars: Vec::new(),
        }
    }

    /// Add compile-time dependencies.
    pub fn with_deps(mut self, deps: impl IntoIterator<Item = Label>) -> Self {
        self.deps.extend(deps);
        self
    }

    /// Add runtime-only dependencies.
    pub fn with_runtime_deps(mut self, deps: impl IntoIterator<Item = Label>) -> Self {
        self.runtime_deps.extend(deps);
        self
    }

    /// Add exported dependencies.
    pub fn with_exports(mut self, deps: impl IntoIterator<Item = Label>) -> Self {
        self.exports.extend(deps);
        self
    }

    /// Add an output artifact.
    pub fn with_jar(mut self, jar: impl Into<PathBuf>, source_jar: Option<PathBuf>) -> Self {
        self.jars.push(JarOutput {
            jar: jar.into(),
            source_jar,
        });
        self
    }
}

/// Per-run store of target metadata, keyed by label.
#[derive(Debug, Clone, Default)]
pub struct TargetInfoStore {
    /// Records in first-insertion order
    infos: Vec<TargetInfo>,

    /// Map from label to position in `infos`
    index: HashMap<Label, usize>,
}

impl TargetInfoStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. A later record for the same label replaces the earlier
    /// one but keeps the original insertion position.
    pub fn add(&mut self, info: TargetInfo) {
        match self.index.get(&info.label) {
            Some(&pos) => {
                tracing::debug!("replacing metadata record for {}", info.label);
                self.infos[pos] = info;
            }
            None => {
                self.index.insert(info.label.clone(), self.infos.len());
                self.infos.push(info);
            }
        }
    }

    /// Add every record from an iterator.
    pub fn add_all(&mut self, infos: impl IntoIterator<Item = TargetInfo>) {
        for info in infos {
            self.add(info);
        }
    }

    /// Get the record for a label.
    pub fn get(&self, label: &Label) -> Option<&TargetInfo> {
        self.index.get(label).map(|&pos| &self.infos[pos])
    }

    /// Check if the store has a record for a label.
    pub fn contains(&self, label: &Label) -> bool {
        self.index.contains_key(label)
    }

    /// Iterate over records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TargetInfo> {
        self.infos.iter()
    }

    /// Records whose label belongs to the given main-repository package.
    pub fn in_package<'a>(&'a self, package: &'a str) -> impl Iterator<Item = &'a TargetInfo> + 'a {
        self.infos
            .iter()
            .filter(move |info| !info.label.is_external() && info.label.package() == package)
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

impl FromIterator<TargetInfo> for TargetInfoStore {
    fn from_iter<I: IntoIterator<Item = TargetInfo>>(iter: I) -> Self {
        let mut store = TargetInfoStore::new();
        store.add_all(iter);
        store
    }
}
