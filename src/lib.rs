//! Trellis - build-metadata dependency resolver for Bazel workspaces
//!
//! This crate turns per-target metadata records into a target dependency
//! graph, a deterministic import order over packages, and a classpath per
//! project assembled from several resolution strategies.

pub mod classpath;
pub mod core;
pub mod graph;
pub mod ops;
pub mod order;
pub mod util;

pub use classpath::{resolve_classpath, ClasspathEntry, ClasspathResult, ClasspathStrategy};
pub use core::{Label, PackageLocation, Project, TargetInfo, TargetInfoStore};
pub use graph::{build_graph, DependencyGraph, GraphError};
pub use order::{order_packages, CycleDetected, PackageOrder};
pub use util::config::AnalysisConfig;
