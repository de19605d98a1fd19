//! Quay CLI - toolchain resolution for multi-platform builds

use anyhow::Result;
use clap::Parser;
use miette::Diagnostic as _;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use quay::util::diagnostic::{MissingHostPlatformError, ResolutionFailedError, WorkspaceNotFoundError};
use quay::util::GlobalContext;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        if let Some(help) = help_for(&e) {
            eprintln!("help: {}", help);
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("quay=debug")
    } else {
        EnvFilter::new("quay=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let mut ctx = GlobalContext::new()?;
    ctx.set_color(!cli.no_color);

    // Execute command
    match cli.command {
        Commands::Resolve(args) => commands::resolve::execute(args, &ctx),
        Commands::Platforms(args) => commands::platforms::execute(args, &ctx),
        Commands::Toolchains(args) => commands::toolchains::execute(args, &ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Help text of the CLI-level report types.
fn help_for(e: &anyhow::Error) -> Option<String> {
    if let Some(d) = e.downcast_ref::<WorkspaceNotFoundError>() {
        return d.help().map(|h| h.to_string());
    }
    if let Some(d) = e.downcast_ref::<MissingHostPlatformError>() {
        return d.help().map(|h| h.to_string());
    }
    if let Some(d) = e.downcast_ref::<ResolutionFailedError>() {
        return d.help().map(|h| h.to_string());
    }
    None
}
