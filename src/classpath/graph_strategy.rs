//! Graph-derived classpath strategy.
//!
//! Walks the dependency graph from a project's targets. Dependencies owned by
//! another project become project references; everything else is resolved to
//! artifacts through the artifact resolver.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::classpath::artifacts::ArtifactResolver;
use crate::classpath::{
    ClasspathEntry, ClasspathResult, ClasspathStrategy, ProjectReference, Unresolved,
};
use crate::core::{Label, Project, ProjectRegistry, TargetInfoStore};
use crate::graph::{DependencyGraph, DependencyKind};

/// How a dependency was reached from the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Scope {
    test: bool,
    runtime: bool,
}

/// Resolves classpaths by walking the target dependency graph.
pub struct GraphStrategy<'a> {
    graph: &'a DependencyGraph,
    store: &'a TargetInfoStore,
    projects: &'a ProjectRegistry,
    artifacts: &'a dyn ArtifactResolver,
}

impl<'a> GraphStrategy<'a> {
    /// Create a strategy over a run's graph, store and projects.
    pub fn new(
        graph: &'a DependencyGraph,
        store: &'a TargetInfoStore,
        projects: &'a ProjectRegistry,
        artifacts: &'a dyn ArtifactResolver,
    ) -> Self {
        GraphStrategy {
            graph,
            store,
            projects,
            artifacts,
        }
    }
}

/// Entries keyed by path. A path reached more than once keeps the weakest
/// scope: it is test-only or runtime-only only if every route to it was.
#[derive(Default)]
struct Entries {
    entries: Vec<ClasspathEntry>,
    index: HashMap<PathBuf, usize>,
}

impl Entries {
    fn add(&mut self, entry: ClasspathEntry) {
        match self.index.get(&entry.path) {
            Some(&pos) => {
                let existing = &mut self.entries[pos];
                existing.is_test_jar &= entry.is_test_jar;
                existing.is_runtime_jar &= entry.is_runtime_jar;
                if existing.source_path.is_none() {
                    existing.source_path = entry.source_path;
                }
            }
            None => {
                self.index.insert(entry.path.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

impl ClasspathStrategy for GraphStrategy<'_> {
    fn name(&self) -> &str {
        "graph"
    }

    fn resolve(&self, project: &Project) -> ClasspathResult {
        let mut result = ClasspathResult::new();
        let mut entries = Entries::default();
        let mut refs: HashSet<String> = HashSet::new();
        let mut unresolved: HashSet<Label> = HashSet::new();
        let mut visited: HashSet<(Label, Scope)> = HashSet::new();

        // Non-test targets first so shared dependencies keep their order
        let mut roots: Vec<(&Label, bool)> = project
            .targets
            .iter()
            .map(|label| {
                let is_test = self
                    .store
                    .get(label)
                    .map(|info| info.kind.is_test())
                    .unwrap_or(false);
                (label, is_test)
            })
            .collect();
        roots.sort_by_key(|&(_, is_test)| is_test);

        for (root, is_test) in roots {
            if !self.graph.contains(root) {
                tracing::debug!("{} has no metadata, cannot walk its dependencies", root);
                if unresolved.insert(root.clone()) {
                    result.mark_unresolved(Unresolved::Target(root.clone()));
                }
                continue;
            }

            let scope = Scope {
                test: is_test,
                runtime: false,
            };
            if !visited.insert((root.clone(), scope)) {
                continue;
            }

            let mut stack: Vec<(&Label, Scope)> = vec![(root, scope)];
            while let Some((current, scope)) = stack.pop() {
                // Reverse so dependencies are visited in declaration order
                for dep in self.graph.dependencies(current).iter().rev() {
                    let dep_scope = Scope {
                        test: scope.test,
                        runtime: scope.runtime || dep.kind == DependencyKind::Runtime,
                    };
                    if visited.insert((dep.label.clone(), dep_scope)) {
                        stack.push((&dep.label, dep_scope));
                    }
                }

                if current == root {
                    continue;
                }

                if project.owns(current) {
                    continue;
                }

                if let Some(other) = self.projects.owning_project(current) {
                    if refs.insert(other.name.clone()) {
                        result.project_refs.push(ProjectReference::from(other));
                    }
                    continue;
                }

                let info = self.store.get(current);
                let candidates = self.artifacts.resolve_target(current, info);
                if candidates.is_empty() {
                    let expects_artifacts = info.map(|i| i.kind.produces_artifacts()).unwrap_or(true);
                    if expects_artifacts && unresolved.insert(current.clone()) {
                        tracing::debug!("no artifact found for {}", current);
                        result.mark_unresolved(Unresolved::Target(current.clone()));
                    }
                    continue;
                }

                for candidate in candidates {
                    entries.add(
                        ClasspathEntry::new(candidate.path)
                            .with_source(candidate.source_path)
                            .test(scope.test || candidate.test_only)
                            .runtime(scope.runtime),
                    );
                }
            }
        }

        result.entries = entries.entries;
        result
    }
}
