//! Push to the review ref and annotate the new change

use crate::config::Config;
use crate::error::StepError;
use crate::pipeline::progress::Step;
use crate::pipeline::reporter::Reporter;
use crate::runner::CommandSpec;
use tracing::warn;

/// What the publisher achieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Review URLs from the push output, in order, duplicates kept
    pub review_urls: Vec<String>,
    /// Set when the provenance note could not be posted
    pub note_error: Option<StepError>,
}

/// Review ref that creates a change for `branch`
pub fn review_ref(branch: &str) -> String {
    format!("HEAD:refs/for/{branch}")
}

/// URLs starting with `prefix`, up to the next whitespace
pub fn extract_review_urls(output: &str, prefix: &str) -> Vec<String> {
    if prefix.is_empty() {
        return Vec::new();
    }
    output
        .match_indices(prefix)
        .map(|(start, _)| {
            let rest = &output[start..];
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            rest[..end].to_string()
        })
        .collect()
}

/// Quote `s` for a POSIX shell
///
/// The review command travels as a single string over ssh and is parsed by
/// the remote shell, so every argument in it must be quoted.
pub fn shell_quote(s: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c);
    if !s.is_empty() && s.chars().all(safe) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r#"'"'"'"#))
}

/// Push `HEAD` for review and post the optional provenance note
pub async fn publish(
    reporter: &Reporter<'_>,
    config: &Config,
    branch: &str,
    commit_id: &str,
    note: Option<&str>,
) -> Result<Published, StepError> {
    reporter.step(Step::Pushing).await;
    let push = reporter
        .run_checked(
            CommandSpec::new(&config.git_path).args([
                "push".to_string(),
                "origin".to_string(),
                review_ref(branch),
            ]),
            StepError::PushFailed,
        )
        .await?;

    let review_urls = extract_review_urls(&push.output, &config.review_url_prefix);
    reporter.review_urls(&review_urls).await;

    let mut note_error = None;
    if let Some(note) = note {
        reporter.step(Step::SubmittingNote).await;
        reporter.message(&format!("Submitting note: {note}")).await;
        let remote_command = format!(
            "gerrit review {} -m {}",
            shell_quote(commit_id),
            shell_quote(note)
        );
        let step = reporter
            .run(CommandSpec::new(&config.ssh_path).args([config.review_host.clone(), remote_command]))
            .await;
        if !step.succeeded() {
            let error = StepError::NoteSubmissionFailed;
            warn!(commit_id, exit_code = step.exit_code, "{error}");
            reporter.warning(&error).await;
            note_error = Some(error);
        }
    }

    Ok(Published {
        review_urls,
        note_error,
    })
}
