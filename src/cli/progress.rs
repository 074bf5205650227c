//! Terminal rendering of the upload transcript

use crate::cli::style::{arrow, check, cross, hyperlink_url, spinner_style, Stream, Stylize};
use anstream::{eprintln, println};
use async_trait::async_trait;
use indicatif::ProgressBar;
use patch_uploader::error::StepError;
use patch_uploader::pipeline::{ProgressCallback, StdinEcho, Step};
use patch_uploader::types::{CommandStep, PipelineOutcome};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Prints every event as it arrives, with a spinner while a command runs
///
/// The spinner draws on stderr and hides itself when stderr is not a
/// terminal, so piping the transcript to a file stays clean.
pub struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// New renderer with no spinner running
    pub const fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn start_spinner(&self, command_line: &str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.set_message(command_line.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Some(old) = self
            .spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(bar)
        {
            old.finish_and_clear();
        }
    }

    fn stop_spinner(&self) {
        if let Some(bar) = self
            .spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            bar.finish_and_clear();
        }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_step(&self, step: Step) {
        println!();
        println!("{} {}", arrow(), step.to_string().emphasis());
    }

    async fn on_command_started(&self, command_line: &str, stdin: Option<&StdinEcho>) {
        match stdin {
            Some(StdinEcho::Source(name)) => {
                println!("$ {} < {}", command_line.emphasis(), name);
            }
            Some(StdinEcho::Inline(text)) => {
                println!("$ {}", command_line.emphasis());
                for line in text.lines() {
                    println!("    {} {}", "|".muted(), line);
                }
            }
            None => println!("$ {}", command_line.emphasis()),
        }
        self.start_spinner(command_line);
    }

    async fn on_command_finished(&self, command: &CommandStep) {
        self.stop_spinner();
        for line in command.output.lines() {
            println!("  {}", line.muted());
        }
        if !command.succeeded() {
            println!(
                "  {} exited with {}",
                cross(),
                command.exit_code.to_string().warn()
            );
        }
    }

    async fn on_message(&self, message: &str) {
        println!("{message}");
    }

    async fn on_review_urls(&self, urls: &[String]) {
        println!();
        if urls.is_empty() {
            println!("{}", "No review URLs found in the push output".muted());
            return;
        }
        println!("{}", "Uploaded patches:".emphasis());
        for url in urls {
            println!("  {} {}", check(), hyperlink_url(Stream::Stdout, url).accent());
        }
    }

    async fn on_warning(&self, error: &StepError) {
        eprintln!("{}: {}", "warning".warn(), error);
    }

    async fn on_failure(&self, error: &StepError) {
        self.stop_spinner();
        eprintln!();
        eprintln!("{} {}", cross(), "Upload failed".error());
        eprintln!("Reason: {error} (check log above for details)");
    }

    async fn on_complete(&self, outcome: &PipelineOutcome) {
        if !outcome.succeeded {
            return;
        }
        println!();
        match (&outcome.redirect_url, &outcome.applied_strategy) {
            (Some(url), Some(strategy)) => println!(
                "{} Uploaded with {}: {}",
                check(),
                strategy.success(),
                hyperlink_url(Stream::Stdout, url).accent()
            ),
            _ => println!("{} {}", check(), "Upload complete".success()),
        }
    }
}
