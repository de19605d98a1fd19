//! `quay toolchains` command

use anyhow::Result;

use crate::cli::ToolchainsArgs;
use crate::commands::{build_options, open_workspace};
use quay::core::constraint::describe_constraints;
use quay::ops::registered_toolchains;
use quay::util::GlobalContext;

pub fn execute(args: ToolchainsArgs, ctx: &GlobalContext) -> Result<()> {
    let (ws, config) = open_workspace(ctx)?;
    let options = build_options(&args.platform, &config)?;

    let toolchains = registered_toolchains(&ws, options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&toolchains)?);
        return Ok(());
    }

    for toolchain in &toolchains {
        println!("{} ({})", toolchain.label, toolchain.toolchain_type);
        println!("    exec:   {}", describe_constraints(&toolchain.exec_constraints));
        println!("    target: {}", describe_constraints(&toolchain.target_constraints));
        println!("    impl:   {}", toolchain.implementation);
    }

    Ok(())
}
