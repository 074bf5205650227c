//! Repository staging: shallow clone and branch discovery

use crate::config::Config;
use crate::error::StepError;
use crate::pipeline::progress::Step;
use crate::pipeline::reporter::{last_line, Reporter};
use crate::runner::CommandSpec;

/// Clone `project` into the reporter's workspace and return its branch
///
/// The branch is whatever the server's HEAD points at; the push later
/// targets the same branch.
pub async fn clone_shallow(
    reporter: &Reporter<'_>,
    config: &Config,
    project: &str,
) -> Result<String, StepError> {
    reporter.step(Step::Cloning).await;
    let dest = reporter.dir().to_string_lossy().into_owned();
    reporter
        .run_checked(
            CommandSpec::new(&config.git_path).args([
                "clone".to_string(),
                "-v".to_string(),
                "-v".to_string(),
                "--depth=1".to_string(),
                config.clone_url(project),
                dest,
            ]),
            StepError::CloneFailed,
        )
        .await?;

    reporter.step(Step::ResolvingBranch).await;
    let query = reporter
        .run_checked(
            CommandSpec::new(&config.git_path).args(["rev-parse", "--abbrev-ref", "HEAD"]),
            StepError::BranchResolutionFailed,
        )
        .await?;

    // a detached HEAD prints "HEAD", which is not something we can push for
    let branch = match last_line(&query.output) {
        Some(b) if b != "HEAD" => b.to_string(),
        _ => return Err(StepError::BranchResolutionFailed),
    };

    reporter
        .message(&format!("Will commit to branch: {branch}"))
        .await;
    Ok(branch)
}
