//! Patch application with ordered fallback strategies

use crate::config::Config;
use crate::error::StepError;
use crate::pipeline::progress::Step;
use crate::pipeline::reporter::Reporter;
use crate::runner::CommandSpec;
use tracing::{debug, info};

/// Name the patch is shown under in the transcript
const PATCH_SOURCE: &str = "patch";

/// One way of applying a patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchStrategy {
    /// Short name reported in the outcome
    pub name: &'static str,
    /// Executable
    pub program: String,
    /// Arguments; the patch arrives on stdin
    pub args: Vec<&'static str>,
}

impl PatchStrategy {
    fn command(&self, patch: &[u8]) -> CommandSpec {
        CommandSpec::new(self.program.clone())
            .args(self.args.iter().copied())
            .stdin_named(PATCH_SOURCE, patch.to_vec())
    }
}

/// Strategies in the order they are tried
///
/// `git apply` understands renames and mode changes, so it goes first.
/// `patch` tolerates context drift; `-p0` is tried before `-p1` because
/// diffs made outside git usually carry bare paths.
pub fn default_strategies(config: &Config) -> Vec<PatchStrategy> {
    vec![
        PatchStrategy {
            name: "git apply",
            program: config.git_path.clone(),
            args: vec!["apply"],
        },
        PatchStrategy {
            name: "patch -p0",
            program: config.patch_path.clone(),
            args: vec!["--no-backup-if-mismatch", "-p0", "-u"],
        },
        PatchStrategy {
            name: "patch -p1",
            program: config.patch_path.clone(),
            args: vec!["--no-backup-if-mismatch", "-p1", "-u"],
        },
    ]
}

/// Replace CRLF line endings with LF
pub fn normalize_line_endings(patch: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(patch.len());
    let mut bytes = patch.iter().peekable();
    while let Some(&b) = bytes.next() {
        if b == b'\r' && bytes.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

/// Apply `patch` with the first strategy that exits zero
///
/// Returns the winning strategy's name. When all of them fail, the error
/// keeps the last strategy's output; the earlier attempts are already in the
/// transcript.
pub async fn apply_patch(
    reporter: &Reporter<'_>,
    strategies: &[PatchStrategy],
    patch: &[u8],
    branch: &str,
) -> Result<&'static str, StepError> {
    reporter.step(Step::ApplyingPatch).await;
    let patch = normalize_line_endings(patch);

    let mut last_output = String::new();
    for strategy in strategies {
        let step = reporter.run(strategy.command(&patch)).await;
        if step.succeeded() {
            info!(strategy = strategy.name, "patch applied");
            return Ok(strategy.name);
        }
        debug!(strategy = strategy.name, exit_code = step.exit_code, "strategy failed");
        last_output = step.output;
    }

    Err(StepError::PatchApplyFailed {
        branch: branch.to_string(),
        last_output,
    })
}
