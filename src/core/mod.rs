//! Core data structures for Trellis.
//!
//! This module contains the value types the resolver operates on:
//! - Labels identifying targets
//! - Target metadata records and the per-run store
//! - The workspace package tree
//! - Projects and the registry mapping labels to projects

pub mod label;
pub mod package;
pub mod project;
pub mod target_info;

pub use label::{Label, LabelError};
pub use package::PackageLocation;
pub use project::{Project, ProjectRegistry};
pub use target_info::{JarOutput, TargetInfo, TargetInfoStore, TargetKind};
