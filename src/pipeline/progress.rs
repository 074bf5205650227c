//! Progress callback trait for interface-agnostic updates
//!
//! The pipeline reports every step and every command through this trait,
//! in execution order, before moving on. A terminal front end prints the
//! events; a web front end would stream them to the browser.

use crate::error::StepError;
use crate::types::{CommandStep, PipelineOutcome};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// Pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Step {
    /// Shallow clone of the project
    Cloning,
    /// Reading the checked-out branch
    ResolvingBranch,
    /// Setting repository-scoped user name and email
    ConfiguringIdentity,
    /// Trying patch strategies
    ApplyingPatch,
    /// `git add -A`
    Staging,
    /// `git commit`
    Committing,
    /// Reading the new commit hash
    ResolvingCommit,
    /// Pushing to the review ref
    Pushing,
    /// Posting the provenance note
    SubmittingNote,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Cloning => "Cloning repository",
            Self::ResolvingBranch => "Resolving branch",
            Self::ConfiguringIdentity => "Configuring identity",
            Self::ApplyingPatch => "Applying patch",
            Self::Staging => "Staging changes",
            Self::Committing => "Committing",
            Self::ResolvingCommit => "Resolving commit",
            Self::Pushing => "Pushing for review",
            Self::SubmittingNote => "Submitting note",
        };
        f.write_str(label)
    }
}

/// How a command's stdin is echoed before it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StdinEcho {
    /// Short payload shown verbatim (e.g. the commit message)
    Inline(String),
    /// Payload streamed from a named source, shown as `< name`
    Source(String),
}

/// Progress callback trait
///
/// Implement this trait to receive the upload transcript as it happens.
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Called when a pipeline step begins
    async fn on_step(&self, step: Step);

    /// Called right before a command runs
    async fn on_command_started(&self, command_line: &str, stdin: Option<&StdinEcho>);

    /// Called with the finished command and its cleaned-up output
    async fn on_command_finished(&self, command: &CommandStep);

    /// Called with a general status message
    async fn on_message(&self, message: &str);

    /// Called once the push output has been scanned for review URLs
    async fn on_review_urls(&self, urls: &[String]);

    /// Called for a failure that does not end the upload
    async fn on_warning(&self, error: &StepError);

    /// Called once when the upload fails, after all output so far
    async fn on_failure(&self, error: &StepError);

    /// Called last, with the final outcome
    async fn on_complete(&self, outcome: &PipelineOutcome);
}

/// No-op progress callback for tests or headless callers
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_step(&self, _step: Step) {}
    async fn on_command_started(&self, _command_line: &str, _stdin: Option<&StdinEcho>) {}
    async fn on_command_finished(&self, _command: &CommandStep) {}
    async fn on_message(&self, _message: &str) {}
    async fn on_review_urls(&self, _urls: &[String]) {}
    async fn on_warning(&self, _error: &StepError) {}
    async fn on_failure(&self, _error: &StepError) {}
    async fn on_complete(&self, _outcome: &PipelineOutcome) {}
}
