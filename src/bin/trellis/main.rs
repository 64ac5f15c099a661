//! Trellis CLI - dependency graph, import order and classpaths for Bazel workspaces

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use trellis::graph::GraphError;
use trellis::util::diagnostic;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        match e.downcast_ref::<GraphError>() {
            Some(err) => diagnostic::emit(&err.to_diagnostic(), std::io::stderr().is_terminal()),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("trellis=debug")
    } else {
        EnvFilter::new("trellis=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        Commands::Packages => commands::packages::execute(&cli.analysis),
        Commands::Roots => commands::roots::execute(&cli.analysis),
        Commands::Order => commands::order::execute(&cli.analysis),
        Commands::Classpath(args) => commands::classpath::execute(args, &cli.analysis),
        Commands::Analyze(args) => commands::analyze::execute(args, &cli.analysis),
    }
}
