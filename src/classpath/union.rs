//! Union resolver - merges strategy results with fixed precedence.
//!
//! Strategies run in the order given. The first strategy to produce an entry
//! for a path wins; later entries for the same path are dropped whole.
//! The merged result is complete only if every strategy was complete.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Serialize;

use crate::classpath::{ClasspathResult, ClasspathStrategy};
use crate::core::{Project, ProjectRegistry};

/// Resolve one project's classpath by running every strategy in order.
pub fn resolve_classpath(project: &Project, strategies: &[&dyn ClasspathStrategy]) -> ClasspathResult {
    let mut result = ClasspathResult::new();
    let mut seen_paths: HashSet<PathBuf> = HashSet::new();
    let mut seen_refs: HashSet<String> = HashSet::new();

    for strategy in strategies {
        let partial = strategy.resolve(project);
        tracing::debug!(
            "{}: strategy `{}` produced {} entries, {} project references{}",
            project.name,
            strategy.name(),
            partial.entries.len(),
            partial.project_refs.len(),
            if partial.is_complete { "" } else { " (incomplete)" }
        );

        for entry in partial.entries {
            if seen_paths.insert(entry.path.clone()) {
                result.entries.push(entry);
            } else {
                tracing::debug!(
                    "{}: `{}` already resolved by an earlier strategy",
                    project.name,
                    entry.path.display()
                );
            }
        }

        for reference in partial.project_refs {
            if reference.name != project.name && seen_refs.insert(reference.name.clone()) {
                result.project_refs.push(reference);
            }
        }

        result.unresolved.extend(partial.unresolved);
        result.is_complete &= partial.is_complete;
    }

    result
}

/// A resolved classpath paired with its project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectClasspath {
    /// Project name
    pub project: String,

    /// Merged classpath
    pub classpath: ClasspathResult,
}

/// Resolve every project in the registry.
///
/// Projects are independent, so they are resolved in parallel; the results
/// come back in registry order. When `cancel` is set, projects not yet
/// started are skipped and only finished results are returned.
pub fn resolve_projects(
    projects: &ProjectRegistry,
    strategies: &[&dyn ClasspathStrategy],
    cancel: Option<&AtomicBool>,
) -> Vec<ProjectClasspath> {
    let projects: Vec<&Project> = projects.iter().collect();

    projects
        .par_iter()
        .filter_map(|project| {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                return None;
            }
            Some(ProjectClasspath {
                project: project.name.clone(),
                classpath: resolve_classpath(project, strategies),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classpath::{ClasspathEntry, ProjectReference, Unresolved};
    use crate::core::Label;

    struct Fixed {
        name: &'static str,
        result: ClasspathResult,
    }

    impl ClasspathStrategy for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn resolve(&self, _project: &Project) -> ClasspathResult {
            self.result.clone()
        }
    }

    fn fixed(name: &'static str, entries: Vec<ClasspathEntry>, complete: bool) -> Fixed {
        let mut result = ClasspathResult::new();
        result.entries = entries;
        if !complete {
            result.mark_unresolved(Unresolved::Target(Label::parse("//gap").unwrap()));
        }
        Fixed { name, result }
    }

    fn project() -> Project {
        Project::new("app", vec![Label::parse("//app").unwrap()])
    }

    #[test]
    fn test_first_strategy_wins() {
        let a = fixed("a", vec![ClasspathEntry::new("/x.jar").test(true)], true);
        let b = fixed(
            "b",
            vec![
                ClasspathEntry::new("/x.jar").runtime(true),
                ClasspathEntry::new("/y.jar"),
            ],
            true,
        );

        let result = resolve_classpath(&project(), &[&a, &b]);
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0], ClasspathEntry::new("/x.jar").test(true));
        assert_eq!(result.entries[1].path, PathBuf::from("/y.jar"));
        assert!(result.is_complete);
    }

    #[test]
    fn test_any_incomplete_strategy_makes_result_incomplete() {
        let a = fixed("a", vec![ClasspathEntry::new("/x.jar")], true);
        let b = fixed("b", vec![], false);
        let c = fixed("c", vec![], true);

        let result = resolve_classpath(&project(), &[&a, &b, &c]);
        assert!(!result.is_complete);
        assert_eq!(result.unresolved.len(), 1);
        assert_eq!(result.entries.len(), 1);
    }

    #[test]
    fn test_project_refs_deduplicated() {
        let mut a = fixed("a", vec![], true);
        a.result.project_refs = vec![
            ProjectReference { name: "//lib".to_string() },
            ProjectReference { name: "//app".to_string() },
        ];
        let mut b = fixed("b", vec![], true);
        b.result.project_refs = vec![
            ProjectReference { name: "//lib".to_string() },
            ProjectReference { name: "//util".to_string() },
        ];

        let result = resolve_classpath(&project(), &[&a, &b]);
        let names: Vec<_> = result.project_refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["//lib", "//util"]);
    }

    #[test]
    fn test_no_strategies_is_empty_and_complete() {
        let result = resolve_classpath(&project(), &[]);
        assert!(result.entries.is_empty());
        assert!(result.is_complete);
    }

    #[test]
    fn test_resolve_projects_keeps_registry_order() {
        let mut registry = ProjectRegistry::new();
        for pkg in ["c", "a", "b"] {
            registry.add(Project::new(pkg, vec![Label::new(pkg, pkg).unwrap()]));
        }
        let a = fixed("a", vec![ClasspathEntry::new("/x.jar")], true);

        let results = resolve_projects(&registry, &[&a], None);
        let names: Vec<_> = results.iter().map(|r| r.project.as_str()).collect();
        assert_eq!(names, vec!["//c", "//a", "//b"]);

        let cancelled = AtomicBool::new(true);
        assert!(resolve_projects(&registry, &[&a], Some(&cancelled)).is_empty());
    }
}
