//! Package import order.
//!
//! Projects the target graph onto packages and emits the selected packages
//! so that every package comes after the packages it depends on. Package
//! cycles do not stop the traversal: the edge that closes a cycle is skipped
//! and the cycle is reported as a diagnostic.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::core::PackageLocation;
use crate::graph::DependencyGraph;
use crate::util::diagnostic::Diagnostic;

/// A cycle between packages found while ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleDetected {
    /// Package labels on the cycle, starting at the package that was re-entered
    pub packages: Vec<String>,
}

impl CycleDetected {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut path = self.packages.clone();
        if let Some(first) = self.packages.first() {
            path.push(first.clone());
        }

        Diagnostic::warning("cycle detected between packages")
            .with_context(format!("cycle: {}", path.join(" -> ")))
            .with_context("the edge closing the cycle was ignored for ordering")
            .with_suggestion(
                "Break the cycle by removing or restructuring dependencies".to_string(),
            )
    }
}

/// Result of ordering packages.
#[derive(Debug, Clone, Serialize)]
pub struct PackageOrder<'a> {
    /// Selected packages, dependencies before dependents
    pub packages: Vec<&'a PackageLocation>,

    /// Package cycles found during traversal
    pub cycles: Vec<CycleDetected>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

struct Frame<'g> {
    package: &'g str,
    neighbors: Vec<&'g str>,
    next: usize,
}

/// Order the selected packages for import.
///
/// Dependencies between packages are taken from the target graph, including
/// dependencies that pass through packages outside the selection. Running
/// this twice on the same inputs yields the same sequence.
pub fn order_packages<'a>(
    tree: &'a PackageLocation,
    selection: &[&'a PackageLocation],
    graph: &DependencyGraph,
) -> PackageOrder<'a> {
    let edges = package_edges(tree, graph);
    let selected: HashMap<&str, &'a PackageLocation> =
        selection.iter().map(|pkg| (pkg.path(), *pkg)).collect();

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut packages: Vec<&'a PackageLocation> = Vec::with_capacity(selection.len());
    let mut cycles = Vec::new();
    let mut seen_cycles: HashSet<BTreeSet<&str>> = HashSet::new();

    for start in selection {
        let start = start.path();
        if marks.contains_key(start) {
            continue;
        }

        marks.insert(start, Mark::InProgress);
        let mut stack = vec![Frame {
            package: start,
            neighbors: neighbors(&edges, start),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(&next) = frame.neighbors.get(frame.next) else {
                // All prerequisites emitted
                let package = frame.package;
                stack.pop();
                marks.insert(package, Mark::Done);
                if let Some(pkg) = selected.get(package) {
                    packages.push(*pkg);
                }
                continue;
            };
            frame.next += 1;

            match marks.get(next) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    let pos = stack
                        .iter()
                        .position(|f| f.package == next)
                        .unwrap_or_default();
                    let members: Vec<&str> = stack[pos..].iter().map(|f| f.package).collect();
                    if seen_cycles.insert(members.iter().copied().collect()) {
                        let cycle = CycleDetected {
                            packages: members.iter().map(|p| format!("//{}", p)).collect(),
                        };
                        tracing::warn!("package cycle: {}", cycle.packages.join(" -> "));
                        cycles.push(cycle);
                    }
                }
                None => {
                    marks.insert(next, Mark::InProgress);
                    stack.push(Frame {
                        package: next,
                        neighbors: neighbors(&edges, next),
                        next: 0,
                    });
                }
            }
        }
    }

    PackageOrder { packages, cycles }
}

fn neighbors<'g>(edges: &'g BTreeMap<String, BTreeSet<String>>, package: &str) -> Vec<&'g str> {
    edges
        .get(package)
        .map(|deps| deps.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Collapse target edges into package edges.
///
/// Each label is mapped to its nearest enclosing package in the tree, so
/// labels in directories skipped by the scanner still attach somewhere.
/// External labels and edges within one package are dropped.
fn package_edges(
    tree: &PackageLocation,
    graph: &DependencyGraph,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut cache: HashMap<String, String> = HashMap::new();
    let mut owner = |package: &str| -> String {
        if let Some(owned) = cache.get(package) {
            return owned.clone();
        }
        let owned = tree
            .nearest_package(package)
            .map(|p| p.path().to_string())
            .unwrap_or_else(|| package.to_string());
        cache.insert(package.to_string(), owned.clone());
        owned
    };

    let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for label in graph.labels() {
        if label.is_external() {
            continue;
        }
        let from = owner(label.package());
        for dep in graph.dependencies(label) {
            if dep.label.is_external() {
                continue;
            }
            let to = owner(dep.label.package());
            if to != from {
                edges.entry(from.clone()).or_default().insert(to);
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Label, TargetInfo, TargetInfoStore, TargetKind};
    use crate::graph::build_graph;

    fn lib(s: &str, deps: &[&str]) -> TargetInfo {
        TargetInfo::new(Label::parse(s).unwrap(), TargetKind::Library)
            .with_deps(deps.iter().map(|d| Label::parse(d).unwrap()))
    }

    fn graph_of(infos: Vec<TargetInfo>) -> DependencyGraph {
        let store: TargetInfoStore = infos.into_iter().collect();
        build_graph(&store).unwrap()
    }

    fn paths(order: &PackageOrder<'_>) -> Vec<String> {
        order.packages.iter().map(|p| p.path().to_string()).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let tree = PackageLocation::from_paths(["app", "core", "util", "web"]);
        let graph = graph_of(vec![
            lib("//app:app", &["//web:web", "//core:core"]),
            lib("//web:web", &["//core:core"]),
            lib("//core:core", &["//util:util"]),
            lib("//util:util", &[]),
        ]);

        let selection = tree.gather_children(None);
        let order = order_packages(&tree, &selection, &graph);

        assert_eq!(paths(&order), vec!["util", "core", "web", "app"]);
        assert!(order.cycles.is_empty());
    }

    #[test]
    fn test_every_package_once_and_no_violations() {
        let tree = PackageLocation::from_paths(["a", "b", "c", "d", "e"]);
        let graph = graph_of(vec![
            lib("//a:one", &["//b:b", "//c:c"]),
            lib("//a:two", &["//d:d"]),
            lib("//b:b", &["//d:d"]),
            lib("//c:c", &["//d:d", "//e:e"]),
            lib("//d:d", &[]),
            lib("//e:e", &[]),
        ]);

        let selection = tree.gather_children(None);
        let order = order_packages(&tree, &selection, &graph);
        let order = paths(&order);

        assert_eq!(order.len(), 5);
        let pos = |p: &str| order.iter().position(|x| x == p).unwrap();
        for (from, to) in [("a", "b"), ("a", "c"), ("a", "d"), ("b", "d"), ("c", "d"), ("c", "e")] {
            assert!(pos(to) < pos(from), "{} must precede {}", to, from);
        }
    }

    #[test]
    fn test_transitive_through_unselected_package() {
        // a -> hidden -> z, only a and z are selected
        let tree = PackageLocation::from_paths(["a", "hidden", "z"]);
        let graph = graph_of(vec![
            lib("//a:a", &["//hidden:h"]),
            lib("//hidden:h", &["//z:z"]),
            lib("//z:z", &[]),
        ]);

        let all = tree.gather_children(None);
        let selection: Vec<_> = all.into_iter().filter(|p| p.path() != "hidden").collect();
        let order = order_packages(&tree, &selection, &graph);

        assert_eq!(paths(&order), vec!["z", "a"]);
    }

    #[test]
    fn test_deterministic() {
        let tree = PackageLocation::from_paths(["p", "q", "r", "s"]);
        let graph = graph_of(vec![
            lib("//s:s", &["//q:q", "//r:r"]),
            lib("//q:q", &["//p:p"]),
            lib("//r:r", &["//p:p"]),
            lib("//p:p", &[]),
        ]);
        let selection = tree.gather_children(None);

        let first = paths(&order_packages(&tree, &selection, &graph));
        let second = paths(&order_packages(&tree, &selection, &graph));
        assert_eq!(first, second);
    }

    #[test]
    fn test_mutual_dependency_reports_one_cycle() {
        // P and Q reference each other through different targets, no target cycle
        let tree = PackageLocation::from_paths(["p", "q"]);
        let graph = graph_of(vec![
            lib("//p:main", &["//q:api"]),
            lib("//p:api", &[]),
            lib("//q:api", &[]),
            lib("//q:impl_test", &["//p:api"]),
        ]);
        assert!(graph.target_cycles().is_empty());

        let selection = tree.gather_children(None);
        let order = order_packages(&tree, &selection, &graph);

        let mut emitted = paths(&order);
        emitted.sort();
        assert_eq!(emitted, vec!["p", "q"]);

        assert_eq!(order.cycles.len(), 1);
        let mut members = order.cycles[0].packages.clone();
        members.sort();
        assert_eq!(members, vec!["//p", "//q"]);
    }

    #[test]
    fn test_packages_without_targets_are_emitted() {
        let tree = PackageLocation::from_paths(["docs", "lib"]);
        let graph = graph_of(vec![lib("//lib:lib", &[])]);

        let selection = tree.gather_children(None);
        let order = order_packages(&tree, &selection, &graph);
        assert_eq!(paths(&order), vec!["docs", "lib"]);
    }

    #[test]
    fn test_cycle_diagnostic() {
        let cycle = CycleDetected {
            packages: vec!["//p".to_string(), "//q".to_string()],
        };
        let output = cycle.to_diagnostic().format(false);
        assert!(output.starts_with("warning: cycle detected"));
        assert!(output.contains("//p -> //q -> //p"));
    }
}
