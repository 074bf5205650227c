//! Core types for patch-uploader

use crate::error::{Error, Result, StepError};
use serde::{Deserialize, Serialize};

/// Everything needed to upload one patch
///
/// Built once per upload by the front end and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    /// Authenticated identity of the person submitting (e.g. a wiki username)
    pub submitter: String,
    /// Gerrit project name (e.g. "mediawiki/core")
    pub project: String,
    /// Author name for the commit
    pub committer_name: String,
    /// Author email for the commit
    pub committer_email: String,
    /// Commit message as entered
    pub message: String,
    /// Raw patch payload
    pub patch: Vec<u8>,
    /// Review comment posted after the push, if any
    pub provenance_note: Option<String>,
}

impl PipelineRequest {
    /// Author string in `Name <email>` form, as passed to `git commit --author`
    pub fn author(&self) -> String {
        format!("{} <{}>", self.committer_name.trim(), self.committer_email.trim())
    }

    /// Reject requests with missing fields
    ///
    /// The messages are the ones shown to the submitter, so they stay short.
    pub fn validate(&self) -> Result<()> {
        if self.submitter.trim().is_empty() {
            return Err(Error::InvalidRequest("Must be logged in".to_string()));
        }
        if self.project.trim().is_empty() {
            return Err(Error::InvalidRequest("project not set".to_string()));
        }
        if self.committer_name.trim().is_empty() || self.committer_email.trim().is_empty() {
            return Err(Error::InvalidRequest("committer not set".to_string()));
        }
        if self.message.trim().is_empty() {
            return Err(Error::InvalidRequest("message not set".to_string()));
        }
        if self.patch.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::InvalidRequest("patch not set".to_string()));
        }
        Ok(())
    }
}

/// One finished external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStep {
    /// Program followed by its arguments
    pub argv: Vec<String>,
    /// Bytes written to the process's stdin
    #[serde(skip)]
    pub stdin: Option<Vec<u8>>,
    /// Exit code; `-1` when the process could not be spawned or was killed
    pub exit_code: i32,
    /// Combined stdout and stderr with terminal escapes removed
    pub output: String,
}

impl CommandStep {
    /// Whether the command exited zero
    pub const fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Command line as shown in the transcript
    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

/// Terminal result of one upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// Whether the patch reached Gerrit
    pub succeeded: bool,
    /// Review URLs found in the push output, in order of appearance
    pub created_review_urls: Vec<String>,
    /// Set only when exactly one review was created
    pub redirect_url: Option<String>,
    /// User-facing reason when the upload failed
    pub failure_reason: Option<String>,
    /// Taxonomy name of the failure
    pub failure_kind: Option<String>,
    /// Tool output behind the failure (the last patch attempt's output)
    pub failure_detail: Option<String>,
    /// Branch the change was pushed for
    pub branch: Option<String>,
    /// Name of the patch strategy that applied
    pub applied_strategy: Option<String>,
    /// Hash of the uploaded commit
    pub commit_id: Option<String>,
    /// Non-fatal problems (note submission, workspace cleanup)
    pub warnings: Vec<String>,
}

impl PipelineOutcome {
    /// Outcome for a pipeline that stopped at `error`
    pub fn failed(error: &StepError) -> Self {
        Self {
            succeeded: false,
            failure_reason: Some(error.to_string()),
            failure_kind: Some(error.kind().to_string()),
            failure_detail: error.detail().map(ToString::to_string),
            ..Self::default()
        }
    }

    /// Successful outcome for the given review URLs
    ///
    /// The redirect hint is derived here so it can never disagree with the
    /// URL list.
    pub fn published(created_review_urls: Vec<String>) -> Self {
        let redirect_url = match created_review_urls.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };
        Self {
            succeeded: true,
            created_review_urls,
            redirect_url,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request() -> PipelineRequest {
        PipelineRequest {
            submitter: "Alice".to_string(),
            project: "demo/repo".to_string(),
            committer_name: "A".to_string(),
            committer_email: "a@x".to_string(),
            message: "Fix bug".to_string(),
            patch: b"--- a/f\n+++ b/f\n".to_vec(),
            provenance_note: None,
        }
    }

    #[test]
    fn test_author_joins_name_and_email() {
        assert_eq!(make_request().author(), "A <a@x>");
    }

    #[test]
    fn test_validate_accepts_complete_request() {
        assert!(make_request().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let req = PipelineRequest {
            message: "  \n".to_string(),
            ..make_request()
        };
        assert_eq!(req.validate().unwrap_err().to_string(), "message not set");

        let req = PipelineRequest {
            patch: Vec::new(),
            ..make_request()
        };
        assert_eq!(req.validate().unwrap_err().to_string(), "patch not set");

        let req = PipelineRequest {
            committer_email: String::new(),
            ..make_request()
        };
        assert_eq!(req.validate().unwrap_err().to_string(), "committer not set");
    }

    #[test]
    fn test_redirect_only_for_single_url() {
        let one = PipelineOutcome::published(vec!["https://review.example/1".into()]);
        assert_eq!(one.redirect_url.as_deref(), Some("https://review.example/1"));

        let none = PipelineOutcome::published(vec![]);
        assert!(none.succeeded);
        assert!(none.redirect_url.is_none());

        let two = PipelineOutcome::published(vec![
            "https://review.example/1".into(),
            "https://review.example/2".into(),
        ]);
        assert!(two.redirect_url.is_none());
    }

    #[test]
    fn test_failed_outcome_carries_reason_and_kind() {
        let outcome = PipelineOutcome::failed(&StepError::PushFailed);
        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure_reason.as_deref(), Some("Push failed"));
        assert_eq!(outcome.failure_kind.as_deref(), Some("PushFailed"));
        assert!(outcome.failure_detail.is_none());
    }

    #[test]
    fn test_failed_patch_outcome_keeps_tool_output() {
        let outcome = PipelineOutcome::failed(&StepError::PatchApplyFailed {
            branch: "master".to_string(),
            last_output: "patch: **** malformed patch at line 3\n".to_string(),
        });
        assert_eq!(
            outcome.failure_detail.as_deref(),
            Some("patch: **** malformed patch at line 3\n")
        );
    }
}
