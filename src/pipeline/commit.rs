//! Commit creation and message normalization

use crate::config::Config;
use crate::error::StepError;
use crate::pipeline::progress::Step;
use crate::pipeline::reporter::{last_line, Reporter};
use crate::runner::CommandSpec;
use regex::Regex;
use std::sync::OnceLock;

/// Gerrit change-tracking trailer
pub const CHANGE_ID_PREFIX: &str = "Change-Id: ";

/// Whether `line` looks like a `Token: value` trailer
pub fn is_trailer(line: &str) -> bool {
    static TRAILER: OnceLock<Regex> = OnceLock::new();
    TRAILER
        .get_or_init(|| Regex::new(r"^[a-zA-Z\-]+: ").expect("hardcoded trailer pattern is valid"))
        .is_match(line)
}

/// Fresh Change-Id value: `I` followed by 20 random bytes in hex
pub fn generate_change_id() -> String {
    let bytes: [u8; 20] = rand::random();
    format!("I{}", hex::encode(bytes))
}

/// Normalize a commit message so it ends with a Change-Id trailer
///
/// Line endings become LF and trailing blank lines are dropped. A message
/// whose last line is already a Change-Id is left alone. Otherwise a new
/// Change-Id is appended directly below a last line that looks like a
/// trailer, or after a blank line when it does not. Normalizing twice gives
/// the same result as normalizing once.
pub fn prepare_message(message: &str) -> String {
    let normalized = message.replace("\r\n", "\n");
    let mut lines: Vec<String> = normalized
        .trim_end()
        .split('\n')
        .map(str::to_string)
        .collect();

    let last = lines.last().map_or("", String::as_str);
    if !last.starts_with(CHANGE_ID_PREFIX) {
        if !is_trailer(last) {
            lines.push(String::new());
        }
        lines.push(format!("{CHANGE_ID_PREFIX}{}", generate_change_id()));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Stage everything, commit as `author`, and return the new commit hash
pub async fn build_commit(
    reporter: &Reporter<'_>,
    config: &Config,
    author: &str,
    message: &str,
) -> Result<String, StepError> {
    reporter.step(Step::Staging).await;
    reporter
        .run_checked(
            CommandSpec::new(&config.git_path).args(["add", "-A"]),
            StepError::NothingToCommit,
        )
        .await?;

    reporter.step(Step::Committing).await;
    let message = prepare_message(message);
    reporter
        .run_checked(
            CommandSpec::new(&config.git_path)
                .args([
                    "commit".to_string(),
                    "-a".to_string(),
                    format!("--author={author}"),
                    "-F".to_string(),
                    "-".to_string(),
                ])
                .stdin_inline(message),
            StepError::CommitFailed,
        )
        .await?;

    reporter.step(Step::ResolvingCommit).await;
    let query = reporter
        .run_checked(
            CommandSpec::new(&config.git_path).args(["rev-list", "-1", "HEAD"]),
            StepError::ShaResolutionFailed,
        )
        .await?;

    match last_line(&query.output) {
        Some(sha) if is_object_id(sha) => Ok(sha.to_string()),
        _ => Err(StepError::ShaResolutionFailed),
    }
}

/// SHA-1 or SHA-256 object id in hex
fn is_object_id(s: &str) -> bool {
    matches!(s.len(), 40 | 64) && s.bytes().all(|b| b.is_ascii_hexdigit())
}
