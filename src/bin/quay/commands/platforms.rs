//! `quay platforms` command

use anyhow::Result;

use crate::cli::PlatformsArgs;
use crate::commands::{build_options, open_workspace};
use quay::core::constraint::describe_constraints;
use quay::ops::execution_platforms;
use quay::util::GlobalContext;

pub fn execute(args: PlatformsArgs, ctx: &GlobalContext) -> Result<()> {
    let (ws, config) = open_workspace(ctx)?;
    let options = build_options(&args.platform, &config)?;

    let platforms = execution_platforms(&ws, options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&platforms)?);
        return Ok(());
    }

    for (i, platform) in platforms.iter().enumerate() {
        println!(
            "{:>3}. {} [{}]",
            i + 1,
            platform.label(),
            describe_constraints(platform.constraints())
        );
    }

    Ok(())
}
