//! Repository-scoped commit identity

use crate::config::Config;
use crate::error::StepError;
use crate::pipeline::progress::Step;
use crate::pipeline::reporter::Reporter;
use crate::runner::CommandSpec;
use tracing::error;

/// Set `user.name` and `user.email` in the clone
///
/// The name references the submitter's wiki account; the email is the
/// service's own. Both are written without `--global`.
pub async fn configure_identity(
    reporter: &Reporter<'_>,
    config: &Config,
    submitter: &str,
) -> Result<(), StepError> {
    reporter.step(Step::ConfiguringIdentity).await;

    let settings = [
        ("user.name", config.identity_for(submitter)),
        ("user.email", config.committer_email.clone()),
    ];
    for (key, value) in settings {
        let step = reporter
            .run(CommandSpec::new(&config.git_path).args(["config".to_string(), key.to_string(), value]))
            .await;
        if !step.succeeded() {
            error!(
                key,
                exit_code = step.exit_code,
                output = %step.output,
                "git config failed in a fresh clone"
            );
            return Err(StepError::ConfigFailed);
        }
    }
    Ok(())
}
