//! Classpath resolution.
//!
//! A classpath is the ordered list of compiled artifacts a project needs,
//! plus references to other in-workspace projects. Several independent
//! strategies each produce a partial result; the union resolver merges them
//! in a fixed order.

pub mod artifacts;
pub mod graph_strategy;
pub mod implicit;
pub mod union;

pub use artifacts::{
    ArtifactCandidate, ArtifactResolver, CachedArtifactResolver, MetadataArtifactResolver,
};
pub use graph_strategy::GraphStrategy;
pub use implicit::{ImplicitConfig, ImplicitStrategy};
pub use union::{resolve_classpath, resolve_projects, ProjectClasspath};

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::{Label, Project};

/// One resolved artifact on a classpath.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClasspathEntry {
    /// Path to the compiled artifact
    pub path: PathBuf,

    /// Path to the companion source artifact, if one exists
    pub source_path: Option<PathBuf>,

    /// Only needed by test targets
    pub is_test_jar: bool,

    /// Only needed at runtime
    pub is_runtime_jar: bool,
}

impl ClasspathEntry {
    /// Create an entry needed for compilation by non-test code.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ClasspathEntry {
            path: path.into(),
            source_path: None,
            is_test_jar: false,
            is_runtime_jar: false,
        }
    }

    /// Attach a companion source artifact.
    pub fn with_source(mut self, source_path: Option<PathBuf>) -> Self {
        self.source_path = source_path;
        self
    }

    /// Mark as test-only.
    pub fn test(mut self, is_test: bool) -> Self {
        self.is_test_jar = is_test;
        self
    }

    /// Mark as runtime-only.
    pub fn runtime(mut self, is_runtime: bool) -> Self {
        self.is_runtime_jar = is_runtime;
        self
    }

    /// Whether a companion source artifact exists.
    pub fn has_source(&self) -> bool {
        self.source_path.is_some()
    }
}

/// A reference from one project to another in-workspace project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProjectReference {
    /// Name of the referenced project
    pub name: String,
}

impl From<&Project> for ProjectReference {
    fn from(project: &Project) -> Self {
        ProjectReference {
            name: project.name.clone(),
        }
    }
}

/// Something a strategy could not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Unresolved {
    /// A dependency target with no known artifact
    Target(Label),
    /// An artifact path that could not be located
    Artifact(PathBuf),
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unresolved::Target(label) => write!(f, "{}", label),
            Unresolved::Artifact(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Classpath for one project, possibly partial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClasspathResult {
    /// Unique entries in resolution order
    pub entries: Vec<ClasspathEntry>,

    /// Referenced in-workspace projects
    pub project_refs: Vec<ProjectReference>,

    /// Whether everything was resolved
    pub is_complete: bool,

    /// What could not be resolved
    pub unresolved: Vec<Unresolved>,
}

impl ClasspathResult {
    /// Create an empty, complete result.
    pub fn new() -> Self {
        ClasspathResult {
            entries: Vec::new(),
            project_refs: Vec::new(),
            is_complete: true,
            unresolved: Vec::new(),
        }
    }

    /// Record something unresolved; the result becomes incomplete.
    pub fn mark_unresolved(&mut self, unresolved: Unresolved) {
        self.is_complete = false;
        self.unresolved.push(unresolved);
    }

    /// Find an entry by artifact path.
    pub fn entry(&self, path: &std::path::Path) -> Option<&ClasspathEntry> {
        self.entries.iter().find(|e| e.path == path)
    }
}

impl Default for ClasspathResult {
    fn default() -> Self {
        Self::new()
    }
}

/// A way of resolving a project's classpath.
///
/// Implementations never fail: anything they cannot resolve is reported
/// through [`ClasspathResult::mark_unresolved`] so other strategies still run.
pub trait ClasspathStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Resolve the part of the classpath this strategy knows about.
    fn resolve(&self, project: &Project) -> ClasspathResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_unresolved() {
        let mut result = ClasspathResult::new();
        assert!(result.is_complete);

        result.mark_unresolved(Unresolved::Artifact(PathBuf::from("missing.jar")));
        assert!(!result.is_complete);
        assert_eq!(result.unresolved[0].to_string(), "missing.jar");
    }

    #[test]
    fn test_entry_builders() {
        let entry = ClasspathEntry::new("/x.jar")
            .with_source(Some(PathBuf::from("/x-src.jar")))
            .test(true);
        assert!(entry.has_source());
        assert!(entry.is_test_jar);
        assert!(!entry.is_runtime_jar);
    }
}
