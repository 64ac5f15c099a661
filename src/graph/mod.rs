//! Target dependency graph.
//!
//! The graph is built fresh for every run from the target metadata store.
//! An edge `a -> b` means "a depends on b". Once built, the graph is
//! read-only and can be shared between threads.

pub mod errors;

pub use errors::GraphError;

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;

use crate::core::{Label, TargetInfoStore};

/// How a dependency was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Needed to compile the dependent
    Compile,
    /// Only needed when running the dependent
    Runtime,
    /// Re-exported to the dependent's consumers
    Export,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKind::Compile => write!(f, "compile"),
            DependencyKind::Runtime => write!(f, "runtime"),
            DependencyKind::Export => write!(f, "export"),
        }
    }
}

/// A direct dependency of a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub label: Label,
    pub kind: DependencyKind,
}

/// The target dependency graph.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Target graph, nodes in store insertion order
    graph: DiGraph<Label, DependencyKind>,

    /// Map from label to node index
    label_to_node: HashMap<Label, NodeIndex>,

    /// Direct dependencies per node, in declaration order
    dependencies: Vec<Vec<Dependency>>,

    /// Direct dependents per node, in insertion order, deduplicated
    dependents: Vec<Vec<Label>>,
}

/// Build the dependency graph for every record in the store.
///
/// Fails on the first dependency pointing at a label without a record, or on
/// the first target that depends on itself.
pub fn build_graph(store: &TargetInfoStore) -> Result<DependencyGraph, GraphError> {
    let mut graph = DiGraph::with_capacity(store.len(), 0);
    let mut label_to_node = HashMap::with_capacity(store.len());

    for info in store.iter() {
        let node = graph.add_node(info.label.clone());
        label_to_node.insert(info.label.clone(), node);
    }

    let mut dependencies = vec![Vec::new(); graph.node_count()];
    let mut dependents: Vec<Vec<Label>> = vec![Vec::new(); graph.node_count()];
    let mut seen_dependents: Vec<HashSet<NodeIndex>> = vec![HashSet::new(); graph.node_count()];

    for info in store.iter() {
        let from = label_to_node[&info.label];
        let declared = info
            .deps
            .iter()
            .map(|l| (l, DependencyKind::Compile))
            .chain(info.runtime_deps.iter().map(|l| (l, DependencyKind::Runtime)))
            .chain(info.exports.iter().map(|l| (l, DependencyKind::Export)));

        for (dep, kind) in declared {
            if *dep == info.label {
                return Err(GraphError::SelfDependency {
                    label: info.label.clone(),
                    kind,
                });
            }

            let to = *label_to_node
                .get(dep)
                .ok_or_else(|| GraphError::DanglingReference {
                    from: info.label.clone(),
                    to: dep.clone(),
                    kind,
                })?;

            graph.add_edge(from, to, kind);
            dependencies[from.index()].push(Dependency {
                label: dep.clone(),
                kind,
            });
            if seen_dependents[to.index()].insert(from) {
                dependents[to.index()].push(info.label.clone());
            }
        }
    }

    tracing::debug!(
        "built dependency graph with {} targets and {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    Ok(DependencyGraph {
        graph,
        label_to_node,
        dependencies,
        dependents,
    })
}

impl DependencyGraph {
    /// Check if a label is in the graph.
    pub fn contains(&self, label: &Label) -> bool {
        self.label_to_node.contains_key(label)
    }

    /// Get the number of targets.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Get the number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterate over all labels in store insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.graph.node_indices().map(move |n| &self.graph[n])
    }

    /// Direct dependencies of a target, in declaration order.
    pub fn dependencies(&self, label: &Label) -> &[Dependency] {
        self.label_to_node
            .get(label)
            .map(|n| self.dependencies[n.index()].as_slice())
            .unwrap_or_default()
    }

    /// Targets that directly depend on the given target.
    pub fn dependents(&self, label: &Label) -> &[Label] {
        self.label_to_node
            .get(label)
            .map(|n| self.dependents[n.index()].as_slice())
            .unwrap_or_default()
    }

    /// Targets nothing else depends on, in store insertion order.
    pub fn roots(&self) -> Vec<&Label> {
        self.graph
            .node_indices()
            .filter(|&n| {
                self.graph
                    .neighbors_directed(n, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|n| &self.graph[n])
            .collect()
    }

    /// Groups of targets that depend on each other in a cycle.
    ///
    /// Each group is sorted, and groups are sorted by their first label.
    pub fn target_cycles(&self) -> Vec<Vec<Label>> {
        let mut cycles: Vec<Vec<Label>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut labels: Vec<Label> = scc.into_iter().map(|n| self.graph[n].clone()).collect();
                labels.sort();
                labels
            })
            .collect();
        cycles.sort();
        cycles
    }
}
