//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use trellis::util::config::ConfigOptions;

/// Trellis - dependency graph, import order and classpaths for Bazel workspaces
#[derive(Parser)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub analysis: AnalysisArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
pub struct AnalysisArgs {
    /// Path to the bazel executable (defaults to bazel or bazelisk on PATH)
    #[arg(long, global = true, env = "TRELLIS_BAZEL")]
    pub bazel: Option<PathBuf>,

    /// Workspace root
    #[arg(short, long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Only analyze packages at or below this package (e.g. //ide/vsc), `-` for all
    #[arg(short, long, global = true)]
    pub scope: Option<String>,

    /// Comma-separated workspace-relative directories to skip
    #[arg(long, global = true, value_delimiter = ',')]
    pub ignore: Vec<String>,

    /// Read pre-produced metadata records from this directory instead of running bazel
    #[arg(long, global = true)]
    pub metadata_dir: Option<PathBuf>,

    /// Directory containing the metadata aspect
    #[arg(long, global = true)]
    pub aspect_dir: Option<PathBuf>,
}

impl AnalysisArgs {
    pub fn to_options(&self) -> ConfigOptions {
        ConfigOptions {
            bazel: self.bazel.clone(),
            workspace: self.workspace.clone(),
            scope: self.scope.clone(),
            ignore: self.ignore.clone(),
            metadata_dir: self.metadata_dir.clone(),
            aspect_dir: self.aspect_dir.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the selected packages
    Packages,

    /// List targets nothing else depends on
    Roots,

    /// Show the selected packages in import order
    Order,

    /// Resolve project classpaths
    Classpath(ClasspathArgs),

    /// Run the full analysis and print a report
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
pub struct ClasspathArgs {
    /// Only show this project (e.g. //app)
    #[arg(short, long)]
    pub project: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
