//! Pipeline driver
//!
//! Runs the steps in order inside one workspace and turns the first fatal
//! step failure into the final outcome.

use crate::config::Config;
use crate::error::StepError;
use crate::pipeline::apply::{apply_patch, default_strategies, PatchStrategy};
use crate::pipeline::commit::build_commit;
use crate::pipeline::identity::configure_identity;
use crate::pipeline::progress::ProgressCallback;
use crate::pipeline::publish::publish;
use crate::pipeline::reporter::Reporter;
use crate::pipeline::stage::clone_shallow;
use crate::runner::{CommandRunner, ProcessRunner};
use crate::types::{PipelineOutcome, PipelineRequest};
use crate::workspace::Workspace;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Milestones reached before the pipeline stopped
#[derive(Debug, Default)]
struct Reached {
    branch: Option<String>,
    applied_strategy: Option<&'static str>,
    commit_id: Option<String>,
}

/// Uploads patches
///
/// Cheap to share: concurrent uploads each get their own workspace and
/// share nothing else.
#[derive(Clone)]
pub struct Uploader {
    config: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
    strategies: Arc<[PatchStrategy]>,
}

impl Uploader {
    /// Uploader running commands through `runner`
    pub fn new(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        let strategies = default_strategies(&config).into();
        Self {
            config: Arc::new(config),
            runner,
            strategies,
        }
    }

    /// Uploader spawning real processes with the configured environment
    pub fn with_processes(config: Config) -> Self {
        let runner = Arc::new(ProcessRunner::new(config.env.clone()));
        Self::new(config, runner)
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole pipeline for one request
    ///
    /// Never fails: every step failure ends up in the returned outcome and,
    /// before that, in a failure event after the output already reported.
    /// The workspace is removed exactly once on every path.
    pub async fn upload(
        &self,
        request: &PipelineRequest,
        progress: &dyn ProgressCallback,
    ) -> PipelineOutcome {
        info!(project = %request.project, submitter = %request.submitter, "starting upload");

        let workspace = match Workspace::acquire(self.config.workspace_root.as_deref()) {
            Ok(ws) => ws,
            Err(e) => {
                error!("{e}");
                progress.on_failure(&e).await;
                let outcome = PipelineOutcome::failed(&e);
                progress.on_complete(&outcome).await;
                return outcome;
            }
        };

        let mut reached = Reached::default();
        let result = self
            .run_steps(request, workspace.path(), progress, &mut reached)
            .await;

        let mut outcome = match result {
            Ok(outcome) => {
                info!(project = %request.project, urls = ?outcome.created_review_urls, "upload finished");
                outcome
            }
            Err(e) => {
                if e.is_internal() {
                    error!(project = %request.project, kind = e.kind(), "{e}");
                } else {
                    warn!(project = %request.project, kind = e.kind(), "{e}");
                }
                progress.on_failure(&e).await;
                PipelineOutcome::failed(&e)
            }
        };
        outcome.branch = reached.branch;
        outcome.applied_strategy = reached.applied_strategy.map(ToString::to_string);
        outcome.commit_id = reached.commit_id;

        if let Err(e) = workspace.release() {
            progress.on_warning(&e).await;
            outcome.warnings.push(e.to_string());
        }

        progress.on_complete(&outcome).await;
        outcome
    }

    async fn run_steps(
        &self,
        request: &PipelineRequest,
        dir: &Path,
        progress: &dyn ProgressCallback,
        reached: &mut Reached,
    ) -> Result<PipelineOutcome, StepError> {
        let reporter = Reporter::new(self.runner.as_ref(), progress, dir);
        let config = self.config.as_ref();

        let branch = clone_shallow(&reporter, config, &request.project).await?;
        reached.branch = Some(branch.clone());

        configure_identity(&reporter, config, &request.submitter).await?;

        let strategy = apply_patch(&reporter, &self.strategies, &request.patch, &branch).await?;
        reached.applied_strategy = Some(strategy);

        let commit_id = build_commit(&reporter, config, &request.author(), &request.message).await?;
        reached.commit_id = Some(commit_id.clone());

        let published = publish(
            &reporter,
            config,
            &branch,
            &commit_id,
            request.provenance_note.as_deref(),
        )
        .await?;

        let mut outcome = PipelineOutcome::published(published.review_urls);
        if let Some(note_error) = published.note_error {
            outcome.warnings.push(note_error.to_string());
        }
        Ok(outcome)
    }
}
