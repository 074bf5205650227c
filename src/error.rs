//! Error types for patch-uploader
//!
//! [`Error`] covers everything outside the upload pipeline (configuration,
//! request validation, the project catalog). [`StepError`] is the failure
//! taxonomy of the pipeline itself; its `Display` text is the reason shown
//! to the user at the end of the transcript.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file could not be read
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        /// Path that was read
        path: std::path::PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        /// Path that was parsed
        path: std::path::PathBuf,
        /// Underlying TOML error
        #[source]
        source: toml::de::Error,
    },

    /// Configuration value is invalid
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Request is missing a required field
    #[error("{0}")]
    InvalidRequest(String),

    /// Project is not in the catalog
    #[error("project unknown: {0}")]
    UnknownProject(String),

    /// Project list could not be fetched
    #[error("failed to list projects: {0}")]
    Catalog(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias for patch-uploader
pub type Result<T> = std::result::Result<T, Error>;

/// A failed pipeline step
///
/// Every variant except [`StepError::NoteSubmissionFailed`] ends the
/// pipeline. The note failure happens after the push already succeeded, so
/// it is reported as a warning on a successful outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepError {
    /// Working directory could not be allocated or removed
    #[error("Working directory unavailable: {0}")]
    WorkspaceUnavailable(String),

    /// `git clone` exited non-zero
    #[error("Clone failed")]
    CloneFailed,

    /// Current branch of the clone could not be determined
    #[error("Could not determine branch")]
    BranchResolutionFailed,

    /// Repository-scoped `git config` failed
    #[error("Git config failed (should never happen)!")]
    ConfigFailed,

    /// Every patch strategy failed
    #[error(
        "Patch failed (is your patch in unified diff format, and does it apply cleanly to {branch}?)"
    )]
    PatchApplyFailed {
        /// Branch the patch was applied against
        branch: String,
        /// Captured output of the last strategy tried
        last_output: String,
    },

    /// `git add -A` failed
    #[error("Git add failed (were no files changed?)")]
    NothingToCommit,

    /// `git commit` failed
    #[error("Commit failed (incorrect format used for author?)")]
    CommitFailed,

    /// Commit hash could not be resolved
    #[error("Could not determine commit SHA1")]
    ShaResolutionFailed,

    /// Push to the review ref failed
    #[error("Push failed")]
    PushFailed,

    /// Provenance note could not be posted
    #[error("Note could not be submitted correctly")]
    NoteSubmissionFailed,
}

impl StepError {
    /// Stable name of the failure kind, used in JSON output and logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::WorkspaceUnavailable(_) => "WorkspaceUnavailable",
            Self::CloneFailed => "CloneFailed",
            Self::BranchResolutionFailed => "BranchResolutionFailed",
            Self::ConfigFailed => "ConfigFailed",
            Self::PatchApplyFailed { .. } => "PatchApplyFailed",
            Self::NothingToCommit => "NothingToCommit",
            Self::CommitFailed => "CommitFailed",
            Self::ShaResolutionFailed => "ShaResolutionFailed",
            Self::PushFailed => "PushFailed",
            Self::NoteSubmissionFailed => "NoteSubmissionFailed",
        }
    }

    /// Tool output kept for diagnosis, if the failure carries any
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::PatchApplyFailed { last_output, .. } if !last_output.is_empty() => {
                Some(last_output)
            }
            _ => None,
        }
    }

    /// Whether the failure points at the environment rather than the input
    ///
    /// These are logged at error level; everything else is usually caused by
    /// the submitted patch or metadata and is logged as a warning.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::WorkspaceUnavailable(_) | Self::ConfigFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_failure_mentions_patch_and_branch() {
        let err = StepError::PatchApplyFailed {
            branch: "master".to_string(),
            last_output: String::new(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Patch failed"));
        assert!(msg.contains("unified diff"));
        assert!(msg.contains("master"));
    }

    #[test]
    fn test_detail_is_last_strategy_output() {
        let err = StepError::PatchApplyFailed {
            branch: "master".to_string(),
            last_output: "1 out of 1 hunk FAILED\n".to_string(),
        };
        assert_eq!(err.detail(), Some("1 out of 1 hunk FAILED\n"));
        assert_eq!(StepError::PushFailed.detail(), None);
    }

    #[test]
    fn test_internal_failures() {
        assert!(StepError::ConfigFailed.is_internal());
        assert!(!StepError::CommitFailed.is_internal());
        assert_eq!(StepError::ConfigFailed.kind(), "ConfigFailed");
    }
}
