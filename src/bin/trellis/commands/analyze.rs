//! `trellis analyze` command

use anyhow::Result;

use super::load;
use crate::cli::{AnalysisArgs, AnalyzeArgs};
use trellis::ops::format_report;

pub fn execute(args: AnalyzeArgs, analysis: &AnalysisArgs) -> Result<()> {
    let (config, analysis) = load(analysis)?;
    let report = analysis
        .report(&config, None)
        .with_bazel_options(config.command_options());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }

    if !report.is_complete() {
        tracing::info!("some classpaths are incomplete");
    }
    Ok(())
}
