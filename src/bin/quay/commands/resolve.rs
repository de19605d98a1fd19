//! `quay resolve` command

use anyhow::Result;
use serde::Serialize;

use crate::cli::ResolveArgs;
use crate::commands::{build_options, open_workspace};
use quay::core::ToolchainContext;
use quay::ops::{resolve_toolchains, RequestOutcome, ResolveOptions, ToolchainRequest};
use quay::util::diagnostic::{self, suggestions, ResolutionFailedError};
use quay::util::{Config, GlobalContext};

/// JSON form of one request outcome.
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum JsonOutcome<'a> {
    Resolved {
        #[serde(flatten)]
        context: &'a ToolchainContext,
    },
    Failed {
        target: &'a str,
        error: String,
    },
    Skipped {
        target: &'a str,
    },
}

pub fn execute(args: ResolveArgs, ctx: &GlobalContext) -> Result<()> {
    let (ws, config) = open_workspace(ctx)?;
    let options = build_options(&args.platform, &config)?;

    let opts = ResolveOptions {
        keep_going: keep_going(&args, &config),
        jobs: args.jobs.or(config.resolution.jobs),
    };
    let request = ToolchainRequest::new(args.target)
        .with_toolchain_types(args.toolchain_types)
        .with_exec_constraints(args.exec_constraints);

    let report = resolve_toolchains(&ws, options, &[request], &opts);

    if args.json {
        let outcomes: Vec<JsonOutcome<'_>> = report
            .outcomes
            .iter()
            .map(|(request, outcome)| match outcome {
                RequestOutcome::Resolved(context) => JsonOutcome::Resolved { context },
                RequestOutcome::Failed(error) => JsonOutcome::Failed {
                    target: &request.target,
                    error: error.to_string(),
                },
                RequestOutcome::Skipped => JsonOutcome::Skipped {
                    target: &request.target,
                },
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for (request, outcome) in &report.outcomes {
            match outcome {
                RequestOutcome::Resolved(context) => print_context(context),
                RequestOutcome::Failed(error) => diagnostic::emit(&error.to_diagnostic(), ctx.color()),
                RequestOutcome::Skipped => {
                    tracing::warn!("skipped {} after an earlier error", request.target)
                }
            }
        }
    }

    if report.is_success() {
        return Ok(());
    }

    let skipped = report
        .outcomes
        .iter()
        .any(|(_, outcome)| matches!(outcome, RequestOutcome::Skipped));
    let hint = if skipped {
        suggestions::KEEP_GOING
    } else {
        suggestions::RESOLUTION_FAILED
    };
    Err(ResolutionFailedError {
        failed: report.failures(),
        total: report.outcomes.len(),
        hint: Some(hint.to_string()),
    }
    .into())
}

/// `--keep-going` / `--no-keep-going`, then the config, then fail fast.
fn keep_going(args: &ResolveArgs, config: &Config) -> bool {
    if args.keep_going {
        true
    } else if args.no_keep_going {
        false
    } else {
        config.resolution.keep_going.unwrap_or(false)
    }
}

fn print_context(context: &ToolchainContext) {
    println!("target:             {}", context.target_description());
    println!("target platform:    {}", context.target_platform().label());
    println!("execution platform: {}", context.execution_platform().label());
    if context.resolved().is_empty() {
        println!("toolchains:         (none)");
        return;
    }
    println!("toolchains:");
    for (toolchain_type, implementation) in context.resolved() {
        println!("  {} -> {}", toolchain_type, implementation);
    }
}
