//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use quay::core::Label;

/// Quay - toolchain resolution for multi-platform builds
#[derive(Parser)]
#[command(name = "quay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select an execution platform and toolchains for a target
    Resolve(ResolveArgs),

    /// List execution platform candidates in priority order
    Platforms(PlatformsArgs),

    /// List registered toolchains in priority order
    Toolchains(ToolchainsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Platform and toolchain flags shared by every workspace command.
#[derive(Args, Debug, Clone)]
pub struct PlatformFlags {
    /// Platform the build tool runs on
    #[arg(long, value_name = "LABEL")]
    pub host_platform: Option<Label>,

    /// Platform to build for (defaults to the host platform)
    #[arg(long, value_name = "LABEL")]
    pub platforms: Option<Label>,

    /// Execution platforms to consider ahead of registered ones
    #[arg(long, value_name = "LABEL", value_delimiter = ',')]
    pub extra_execution_platforms: Vec<Label>,

    /// Toolchains to consider ahead of registered ones
    #[arg(long, value_name = "LABEL", value_delimiter = ',')]
    pub extra_toolchains: Vec<Label>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Toolchain types the target requires
    #[arg(long = "toolchain-type", value_name = "LABEL", value_delimiter = ',')]
    pub toolchain_types: Vec<Label>,

    /// Constraints the execution platform must satisfy
    #[arg(long = "exec-constraint", value_name = "LABEL", value_delimiter = ',')]
    pub exec_constraints: Vec<Label>,

    /// Description of the requesting target, used in messages
    #[arg(long, default_value = "//:cli")]
    pub target: String,

    #[command(flatten)]
    pub platform: PlatformFlags,

    /// Report every error instead of stopping at the first one
    #[arg(short, long, overrides_with = "no_keep_going")]
    pub keep_going: bool,

    /// Stop at the first error, even if the config says to keep going
    #[arg(long, overrides_with = "keep_going")]
    pub no_keep_going: bool,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct PlatformsArgs {
    #[command(flatten)]
    pub platform: PlatformFlags,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ToolchainsArgs {
    #[command(flatten)]
    pub platform: PlatformFlags,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
