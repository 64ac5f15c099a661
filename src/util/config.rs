//! Configuration for an analysis run.
//!
//! Settings come from two places:
//! - Command-line options, validated into an [`AnalysisConfig`]
//! - Project: `.trellis/config.toml` in the workspace, for ignore paths and
//!   implicit dependency rules
//!
//! Command-line options take precedence over the project file. The config is
//! built once at startup and passed to every operation that needs it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classpath::ImplicitConfig;
use crate::core::label::{parse_package_scope, LabelError};
use crate::util::bazel::{CommandOptions, OutputLayout};
use crate::util::process::find_executable;

/// Name of the metadata aspect file expected in an aspect directory.
pub const ASPECT_FILE: &str = "trellis_aspect.bzl";

/// Executables tried, in order, when no build tool path is given.
const BAZEL_CANDIDATES: &[&str] = &["bazel", "bazelisk"];

/// Error validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bazel executable does not exist: {}", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("no bazel executable found on PATH; pass --bazel or --metadata-dir")]
    NoExecutable,

    #[error("workspace directory does not exist: {}", .0.display())]
    WorkspaceNotFound(PathBuf),

    #[error("workspace path is not a directory: {}", .0.display())]
    WorkspaceNotDirectory(PathBuf),

    #[error("scope `{scope}` must be a concrete package label, such as //foo/bar")]
    InvalidScope {
        scope: String,
        #[source]
        source: LabelError,
    },

    #[error("metadata directory does not exist: {}", .0.display())]
    MetadataDirNotFound(PathBuf),

    #[error("trellis_aspect.bzl not found in aspect directory: {}", .0.display())]
    AspectNotFound(PathBuf),
}

/// Unvalidated options, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Path to the bazel executable
    pub bazel: Option<PathBuf>,

    /// Workspace root
    pub workspace: PathBuf,

    /// Package scope (`//foo/bar`), `-` for none
    pub scope: Option<String>,

    /// Workspace-relative directories to skip
    pub ignore: Vec<String>,

    /// Directory with pre-produced metadata records
    pub metadata_dir: Option<PathBuf>,

    /// Directory containing the metadata aspect
    pub aspect_dir: Option<PathBuf>,
}

/// Validated configuration for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    bazel: Option<PathBuf>,
    bazel_explicit: bool,
    workspace: PathBuf,
    scope: Option<String>,
    ignore: BTreeSet<PathBuf>,
    metadata_dir: Option<PathBuf>,
    aspect_dir: Option<PathBuf>,
    implicit: ImplicitConfig,
    layout: OutputLayout,
}

impl AnalysisConfig {
    /// Validate command-line options.
    ///
    /// A bazel executable is only required when metadata has to be produced,
    /// i.e. when no metadata directory is given.
    pub fn from_options(opts: ConfigOptions) -> Result<Self, ConfigError> {
        if !opts.workspace.exists() {
            return Err(ConfigError::WorkspaceNotFound(opts.workspace));
        }
        if !opts.workspace.is_dir() {
            return Err(ConfigError::WorkspaceNotDirectory(opts.workspace));
        }
        let workspace = canonical(&opts.workspace);

        let metadata_dir = match opts.metadata_dir {
            Some(dir) => {
                let dir = if dir.is_absolute() { dir } else { workspace.join(dir) };
                if !dir.is_dir() {
                    return Err(ConfigError::MetadataDirNotFound(dir));
                }
                Some(canonical(&dir))
            }
            None => None,
        };

        let bazel_explicit = opts.bazel.is_some();
        let bazel = match opts.bazel {
            Some(path) => {
                let resolved = if path.exists() {
                    Some(path.clone())
                } else {
                    path.to_str().and_then(find_executable)
                };
                match resolved {
                    Some(found) => Some(canonical(&found)),
                    None => return Err(ConfigError::ExecutableNotFound(path)),
                }
            }
            None => BAZEL_CANDIDATES.iter().find_map(|name| find_executable(name)),
        };
        if bazel.is_none() && metadata_dir.is_none() {
            return Err(ConfigError::NoExecutable);
        }

        let scope = match opts.scope.as_deref().map(str::trim) {
            None | Some("-") | Some("") => None,
            Some(scope) => {
                let package =
                    parse_package_scope(scope).map_err(|source| ConfigError::InvalidScope {
                        scope: scope.to_string(),
                        source,
                    })?;
                Some(package).filter(|p| !p.is_empty())
            }
        };

        let aspect_dir = match opts.aspect_dir {
            Some(dir) => {
                if !dir.join(ASPECT_FILE).is_file() {
                    return Err(ConfigError::AspectNotFound(dir));
                }
                Some(canonical(&dir))
            }
            None => None,
        };

        Ok(AnalysisConfig {
            bazel,
            bazel_explicit,
            layout: OutputLayout::for_workspace(&workspace),
            workspace,
            scope,
            ignore: opts.ignore.iter().filter_map(|s| normalize_ignore(s)).collect(),
            metadata_dir,
            aspect_dir,
            implicit: ImplicitConfig::default(),
        })
    }

    /// Apply settings from the project file. Command-line ignores are kept.
    pub fn with_project_config(mut self, project: ProjectConfig) -> Self {
        self.ignore.extend(
            project
                .ignore
                .iter()
                .filter_map(|p| normalize_ignore(&p.to_string_lossy())),
        );
        self.implicit = project.implicit;
        self
    }

    /// Load `.trellis/config.toml` from the workspace, if present, and apply it.
    pub fn load_project_config(self) -> Self {
        let path = project_config_path(&self.workspace);
        let project = ProjectConfig::load_or_default(&path);
        self.with_project_config(project)
    }

    /// Path to the bazel executable, if one was found.
    pub fn bazel(&self) -> Option<&Path> {
        self.bazel.as_deref()
    }

    /// Workspace root (canonical).
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Package scope without leading slashes, `None` for the whole workspace.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Workspace-relative directories to skip when scanning.
    pub fn ignore(&self) -> &BTreeSet<PathBuf> {
        &self.ignore
    }

    /// Directory with pre-produced metadata records.
    pub fn metadata_dir(&self) -> Option<&Path> {
        self.metadata_dir.as_deref()
    }

    /// Directory containing the metadata aspect.
    pub fn aspect_dir(&self) -> Option<&Path> {
        self.aspect_dir.as_deref()
    }

    /// Implicit dependency rules.
    pub fn implicit(&self) -> &ImplicitConfig {
        &self.implicit
    }

    /// The bazel to ask about the workspace, if this run uses one.
    ///
    /// Runs producing metadata always do. Runs over pre-produced records only
    /// do when a bazel executable was named explicitly; otherwise the records
    /// are taken to be relative to the workspace.
    pub fn query_bazel(&self) -> Option<&Path> {
        self.bazel
            .as_deref()
            .filter(|_| self.metadata_dir.is_none() || self.bazel_explicit)
    }

    /// Ask bazel for the execution root and binary directory.
    ///
    /// Without a bazel to ask, the workspace layout is kept.
    pub fn query_layout(mut self) -> Result<Self> {
        if let Some(bazel) = self.query_bazel() {
            let layout = OutputLayout::query(bazel, &self.workspace)?;
            self.layout = layout;
        }
        Ok(self)
    }

    /// The rc options bazel applies in the workspace, when bazel is in use.
    ///
    /// A failed query is logged and reported as no options.
    pub fn command_options(&self) -> Option<CommandOptions> {
        let bazel = self.query_bazel()?;
        match CommandOptions::query(bazel, &self.workspace) {
            Ok(options) => Some(options),
            Err(e) => {
                tracing::warn!("could not read bazel options: {:#}", e);
                None
            }
        }
    }

    /// Where build inputs and outputs live.
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Root that artifact paths in records are relative to.
    pub fn exec_root(&self) -> &Path {
        &self.layout.execution_root
    }

    /// The binary output directory.
    pub fn bin_dir(&self) -> &Path {
        &self.layout.bin_dir
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn normalize_ignore(s: &str) -> Option<PathBuf> {
    let trimmed = s.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

/// Settings from `.trellis/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Extra workspace-relative directories to skip
    pub ignore: Vec<PathBuf>,

    /// Implicit dependency rules
    pub implicit: ImplicitConfig,
}

impl ProjectConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }
}

/// Get the project config path (.trellis/config.toml).
pub fn project_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".trellis").join("config.toml")
}
