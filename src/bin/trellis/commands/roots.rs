//! `trellis roots` command

use anyhow::Result;

use super::load;
use crate::cli::AnalysisArgs;

pub fn execute(analysis: &AnalysisArgs) -> Result<()> {
    let (_, analysis) = load(analysis)?;

    for root in analysis.roots() {
        println!("{}", root);
    }
    Ok(())
}
