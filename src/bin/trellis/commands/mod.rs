//! Command implementations

pub mod analyze;
pub mod classpath;
pub mod order;
pub mod packages;
pub mod roots;

use anyhow::Result;

use crate::cli::AnalysisArgs;
use trellis::ops::{load_analysis, metadata_source, Analysis};
use trellis::util::config::AnalysisConfig;

/// Validate the shared options, apply `.trellis/config.toml` and ask bazel
/// where its outputs live.
pub fn load_config(args: &AnalysisArgs) -> Result<AnalysisConfig> {
    let config = AnalysisConfig::from_options(args.to_options())?
        .load_project_config()
        .query_layout()?;
    tracing::debug!("analysis config: {:?}", config);
    Ok(config)
}

/// Load the configuration and ingest metadata.
pub fn load(args: &AnalysisArgs) -> Result<(AnalysisConfig, Analysis)> {
    let config = load_config(args)?;
    let source = metadata_source(&config)?;
    let analysis = load_analysis(&config, source.as_ref())?;
    Ok((config, analysis))
}
