//! Shared utilities

pub mod bazel;
pub mod config;
pub mod diagnostic;
pub mod process;

pub use bazel::{CommandOptions, OutputLayout};
pub use config::{AnalysisConfig, ConfigError, ConfigOptions, ProjectConfig};
pub use diagnostic::Diagnostic;
