//! High-level operations.
//!
//! This module wires the core types to the workspace on disk and implements
//! the work behind each trellis command.

pub mod analyze;
pub mod artifacts;
pub mod metadata;
pub mod report;
pub mod scan;

pub use analyze::{
    analyze, load_analysis, load_workspace, metadata_source, Analysis, AnalysisReport,
    WorkspaceScan,
};
pub use artifacts::WorkspaceArtifactResolver;
pub use metadata::{BazelMetadataSource, DirectoryMetadataSource, MetadataSource};
pub use report::{format_classpath, format_order, format_packages, format_report, format_roots};
pub use scan::{scan_workspace, workspace_name};
