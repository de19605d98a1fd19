//! Toolchain resolution for a batch of requests.

use crate::core::{BuildOptions, Workspace};
use crate::engine::EvaluationOptions;
use crate::ops::session::{ResolutionSession, ResolveReport, ToolchainRequest};

/// Options for [`resolve_toolchains`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Report every failing request instead of stopping at the first error
    pub keep_going: bool,
    /// Worker threads (None = one per CPU)
    pub jobs: Option<usize>,
}

impl ResolveOptions {
    fn evaluation(&self) -> EvaluationOptions {
        EvaluationOptions {
            keep_going: self.keep_going,
        }
    }
}

/// Resolve the toolchains of every request in `ws` under `options`.
pub fn resolve_toolchains(
    ws: &Workspace,
    options: BuildOptions,
    requests: &[ToolchainRequest],
    opts: &ResolveOptions,
) -> ResolveReport {
    tracing::info!(
        "Resolving toolchains for {} request(s) (target platform {})",
        requests.len(),
        options.target_platform
    );

    let session = ResolutionSession::new(ws, opts.jobs);
    let report = session.resolve(options, requests, opts.evaluation());

    if !report.is_success() {
        tracing::info!(
            "{} of {} request(s) failed to resolve",
            report.failures(),
            requests.len()
        );
    }
    report
}
