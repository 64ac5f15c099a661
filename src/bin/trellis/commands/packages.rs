//! `trellis packages` command

use anyhow::Result;

use super::load_config;
use crate::cli::AnalysisArgs;
use trellis::ops::{format_packages, load_workspace};

pub fn execute(analysis: &AnalysisArgs) -> Result<()> {
    let config = load_config(analysis)?;
    let scan = load_workspace(&config)?;

    let selection = scan.selection();
    if selection.is_empty() {
        eprintln!("no packages found in {}", scan.root.display());
        return Ok(());
    }

    print!("{}", format_packages(&scan.tree, &selection));
    Ok(())
}
