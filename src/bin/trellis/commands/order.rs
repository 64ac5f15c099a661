//! `trellis order` command

use anyhow::Result;

use super::load;
use crate::cli::AnalysisArgs;
use trellis::ops::format_order;

pub fn execute(analysis: &AnalysisArgs) -> Result<()> {
    let (_, analysis) = load(analysis)?;
    let order = analysis.order();

    let labels: Vec<String> = order.packages.iter().map(|p| p.label()).collect();
    print!("{}", format_order(&labels, &order.cycles));
    Ok(())
}
