//! `trellis classpath` command

use anyhow::{anyhow, Result};

use super::load;
use crate::cli::{AnalysisArgs, ClasspathArgs};
use trellis::ops::format_classpath;
use trellis::util::diagnostic::suggestions;

pub fn execute(args: ClasspathArgs, analysis: &AnalysisArgs) -> Result<()> {
    let (config, analysis) = load(analysis)?;
    let projects = analysis.projects();

    let results = match args.project {
        Some(ref name) => {
            let project = projects.get(name).ok_or_else(|| {
                anyhow!(
                    "no project named `{}` in scope\n{}",
                    name,
                    suggestions::PROJECT_NOT_FOUND
                )
            })?;
            vec![analysis.classpath(&config, &projects, project)]
        }
        None => analysis.classpaths(&config, &projects, None),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            print!("{}", format_classpath(result));
        }
    }

    Ok(())
}
