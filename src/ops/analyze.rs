//! The analysis pipeline.
//!
//! scan -> select -> ingest -> store -> graph -> roots -> order -> projects
//! -> classpaths. Each stage is available on its own so commands only pay
//! for what they print.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::classpath::{
    resolve_classpath, resolve_projects, CachedArtifactResolver, ClasspathStrategy, GraphStrategy,
    ImplicitStrategy, ProjectClasspath,
};
use crate::core::{Label, PackageLocation, Project, ProjectRegistry, TargetInfoStore};
use crate::graph::{build_graph, DependencyGraph};
use crate::ops::artifacts::WorkspaceArtifactResolver;
use crate::ops::metadata::{BazelMetadataSource, DirectoryMetadataSource, MetadataSource};
use crate::ops::scan::{scan_workspace, workspace_name};
use crate::order::{order_packages, CycleDetected, PackageOrder};
use crate::util::bazel::CommandOptions;
use crate::util::config::{AnalysisConfig, ConfigError};
use crate::util::diagnostic::suggestions;

/// A scanned workspace and its selected packages.
#[derive(Debug, Clone)]
pub struct WorkspaceScan {
    /// Workspace name
    pub name: String,

    /// Workspace root
    pub root: PathBuf,

    /// Package tree
    pub tree: PackageLocation,

    scope: Option<String>,
}

impl WorkspaceScan {
    /// The packages selected by the configured scope.
    pub fn selection(&self) -> Vec<&PackageLocation> {
        self.tree.gather_children(self.scope.as_deref())
    }

    /// The configured scope as a package label.
    pub fn scope_label(&self) -> Option<String> {
        self.scope.as_ref().map(|s| format!("//{}", s))
    }
}

/// Scan the configured workspace.
pub fn load_workspace(config: &AnalysisConfig) -> Result<WorkspaceScan> {
    let root = config.workspace().to_path_buf();
    let tree = scan_workspace(&root, config.ignore())?;

    let scan = WorkspaceScan {
        name: workspace_name(&root),
        root,
        tree,
        scope: config.scope().map(str::to_string),
    };

    if let Some(label) = scan.scope_label() {
        if scan.selection().is_empty() {
            bail!(
                "scope {} matches no packages in {}\n{}",
                label,
                scan.root.display(),
                suggestions::SCOPE_NOT_FOUND
            );
        }
    }

    Ok(scan)
}

/// The metadata source for a configuration.
///
/// Pre-produced records win over running the build tool.
pub fn metadata_source(config: &AnalysisConfig) -> Result<Box<dyn MetadataSource>> {
    if let Some(dir) = config.metadata_dir() {
        return Ok(Box::new(DirectoryMetadataSource::new(dir)));
    }
    let bazel = config.bazel().ok_or(ConfigError::NoExecutable)?;
    Ok(Box::new(BazelMetadataSource::new(
        bazel,
        config.workspace(),
        config.exec_root(),
        config.aspect_dir().map(|p| p.to_path_buf()),
    )))
}

/// A workspace with its metadata ingested and graph built.
#[derive(Debug)]
pub struct Analysis {
    pub scan: WorkspaceScan,
    pub store: TargetInfoStore,
    pub graph: DependencyGraph,
}

/// Ingest metadata and build the dependency graph.
pub fn load_analysis(config: &AnalysisConfig, source: &dyn MetadataSource) -> Result<Analysis> {
    let scan = load_workspace(config)?;

    let infos = {
        let selection = scan.selection();
        tracing::info!("collecting metadata from {}", source.describe());
        source
            .collect(&selection)
            .with_context(|| format!("failed to collect metadata\n{}", suggestions::METADATA_FAILED))?
    };

    let mut store = TargetInfoStore::new();
    store.add_all(infos);
    tracing::info!("loaded {} targets", store.len());

    let graph = build_graph(&store)?;
    tracing::debug!(
        "dependency graph has {} targets and {} edges",
        graph.len(),
        graph.edge_count()
    );

    Ok(Analysis { scan, store, graph })
}

impl Analysis {
    /// Targets nothing else depends on.
    pub fn roots(&self) -> Vec<&Label> {
        self.graph.roots()
    }

    /// Selected packages in import order.
    pub fn order(&self) -> PackageOrder<'_> {
        order_packages(&self.scan.tree, &self.scan.selection(), &self.graph)
    }

    /// Projects for the selected packages.
    pub fn projects(&self) -> ProjectRegistry {
        ProjectRegistry::from_packages(&self.scan.selection(), &self.store)
    }

    fn with_strategies<T>(
        &self,
        config: &AnalysisConfig,
        projects: &ProjectRegistry,
        f: impl FnOnce(&[&dyn ClasspathStrategy]) -> T,
    ) -> T {
        let artifacts = CachedArtifactResolver::new(WorkspaceArtifactResolver::new(
            config.exec_root(),
            config.bin_dir(),
        ));

        let graph_strategy = GraphStrategy::new(&self.graph, &self.store, projects, &artifacts);
        let implicit_strategy = ImplicitStrategy::new(config.implicit(), &self.store, &artifacts);
        let strategies: [&dyn ClasspathStrategy; 2] = [&graph_strategy, &implicit_strategy];
        f(&strategies)
    }

    /// Resolve the classpath of every project.
    ///
    /// When `cancel` is set, only the projects finished so far are returned.
    pub fn classpaths(
        &self,
        config: &AnalysisConfig,
        projects: &ProjectRegistry,
        cancel: Option<&AtomicBool>,
    ) -> Vec<ProjectClasspath> {
        self.with_strategies(config, projects, |strategies| {
            resolve_projects(projects, strategies, cancel)
        })
    }

    /// Resolve the classpath of a single project.
    pub fn classpath(
        &self,
        config: &AnalysisConfig,
        projects: &ProjectRegistry,
        project: &Project,
    ) -> ProjectClasspath {
        self.with_strategies(config, projects, |strategies| ProjectClasspath {
            project: project.name.clone(),
            classpath: resolve_classpath(project, strategies),
        })
    }

    /// Build the full report.
    pub fn report(&self, config: &AnalysisConfig, cancel: Option<&AtomicBool>) -> AnalysisReport {
        let order = self.order();
        let projects = self.projects();

        AnalysisReport {
            workspace: self.scan.name.clone(),
            root: self.scan.root.clone(),
            scope: self.scan.scope_label(),
            packages: self.scan.selection().iter().map(|p| p.label()).collect(),
            bazel_options: None,
            target_count: self.store.len(),
            roots: self.roots().into_iter().cloned().collect(),
            target_cycles: self.graph.target_cycles(),
            order: order.packages.iter().map(|p| p.label()).collect(),
            cycles: order.cycles.clone(),
            projects: self.classpaths(config, &projects, cancel),
        }
    }
}

/// Everything one analysis run found.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Workspace name
    pub workspace: String,

    /// Workspace root
    pub root: PathBuf,

    /// Scope label, if any
    pub scope: Option<String>,

    /// Selected package labels, depth-first
    pub packages: Vec<String>,

    /// rc options bazel applies in the workspace, when bazel was used
    pub bazel_options: Option<CommandOptions>,

    /// Number of targets with metadata
    pub target_count: usize,

    /// Targets nothing else depends on
    pub roots: Vec<Label>,

    /// Groups of targets that depend on each other
    pub target_cycles: Vec<Vec<Label>>,

    /// Selected packages in import order
    pub order: Vec<String>,

    /// Package cycles
    pub cycles: Vec<CycleDetected>,

    /// Classpath per project, in project order
    pub projects: Vec<ProjectClasspath>,
}

impl AnalysisReport {
    /// Whether every project's classpath was fully resolved.
    pub fn is_complete(&self) -> bool {
        self.projects.iter().all(|p| p.classpath.is_complete)
    }

    /// Attach the workspace's bazel options.
    pub fn with_bazel_options(mut self, options: Option<CommandOptions>) -> Self {
        self.bazel_options = options;
        self
    }
}

/// Run the whole pipeline with the configured metadata source.
///
/// Artifacts are resolved against the config's output layout; see
/// [`AnalysisConfig::query_layout`].
pub fn analyze(config: &AnalysisConfig) -> Result<AnalysisReport> {
    let source = metadata_source(config)?;
    let analysis = load_analysis(config, source.as_ref())?;
    Ok(analysis
        .report(config, None)
        .with_bazel_options(config.command_options()))
}
