//! Runs commands for a pipeline step and reports them as they happen

use crate::error::StepError;
use crate::pipeline::progress::{ProgressCallback, StdinEcho, Step};
use crate::runner::{CommandRunner, CommandSpec};
use crate::types::CommandStep;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Runs commands inside one workspace and echoes them to a progress sink
///
/// Each command is announced (with its stdin) before it starts and its
/// output is reported as soon as it exits, so the transcript always matches
/// execution order.
pub struct Reporter<'a> {
    runner: &'a dyn CommandRunner,
    progress: &'a dyn ProgressCallback,
    dir: &'a Path,
}

impl<'a> Reporter<'a> {
    /// Reporter for commands run in `dir`
    pub fn new(
        runner: &'a dyn CommandRunner,
        progress: &'a dyn ProgressCallback,
        dir: &'a Path,
    ) -> Self {
        Self {
            runner,
            progress,
            dir,
        }
    }

    /// Working directory for every command
    pub const fn dir(&self) -> &Path {
        self.dir
    }

    /// Announce a step
    pub async fn step(&self, step: Step) {
        debug!(%step, "step");
        self.progress.on_step(step).await;
    }

    /// Emit a status message
    pub async fn message(&self, message: &str) {
        self.progress.on_message(message).await;
    }

    /// Emit the review URLs found in the push output
    pub async fn review_urls(&self, urls: &[String]) {
        self.progress.on_review_urls(urls).await;
    }

    /// Emit a non-fatal failure
    pub async fn warning(&self, error: &StepError) {
        self.progress.on_warning(error).await;
    }

    /// Run a command, whatever its exit code
    pub async fn run(&self, command: CommandSpec) -> CommandStep {
        let argv = command.argv();
        let command_line = argv.join(" ");
        let echo = command.stdin.as_ref().map(|payload| match &payload.source {
            Some(name) => StdinEcho::Source(name.clone()),
            None => StdinEcho::Inline(String::from_utf8_lossy(&payload.bytes).into_owned()),
        });

        self.progress
            .on_command_started(&command_line, echo.as_ref())
            .await;

        let raw = self.runner.run(self.dir, &command).await;
        let step = CommandStep {
            argv,
            stdin: command.stdin.map(|payload| payload.bytes),
            exit_code: raw.exit_code,
            output: strip_terminal_escapes(&raw.output),
        };

        self.progress.on_command_finished(&step).await;
        step
    }

    /// Run a command and map a non-zero exit to `failure`
    pub async fn run_checked(
        &self,
        command: CommandSpec,
        failure: StepError,
    ) -> Result<CommandStep, StepError> {
        let step = self.run(command).await;
        if step.succeeded() {
            Ok(step)
        } else {
            debug!(command = %step.command_line(), exit_code = step.exit_code, "command failed");
            Err(failure)
        }
    }
}

/// Remove ANSI control sequences (`ESC[K` and friends) from command output
pub fn strip_terminal_escapes(output: &str) -> String {
    static CSI: OnceLock<Regex> = OnceLock::new();
    if !output.contains('\x1b') {
        return output.to_string();
    }
    let re = CSI.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("hardcoded escape pattern is valid")
    });
    re.replace_all(output, "").into_owned()
}

/// Last non-blank line of a command's output, trimmed
///
/// Output is stdout and stderr combined, so a warning printed before the
/// value must not be mistaken for it.
pub fn last_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).rfind(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_erase_line() {
        let raw = "remote: Processing changes: refs: 1\x1b[K\nremote: done\x1b[K\n";
        assert_eq!(
            strip_terminal_escapes(raw),
            "remote: Processing changes: refs: 1\nremote: done\n"
        );
    }

    #[test]
    fn test_strips_color_codes() {
        assert_eq!(strip_terminal_escapes("\x1b[1;31merror\x1b[0m: x"), "error: x");
    }

    #[test]
    fn test_plain_output_untouched() {
        assert_eq!(strip_terminal_escapes("[K is not an escape"), "[K is not an escape");
    }

    #[test]
    fn test_last_line_skips_blanks_and_warnings() {
        assert_eq!(last_line("warning: x\nmaster\n\n"), Some("master"));
        assert_eq!(last_line("  \n"), None);
    }
}
