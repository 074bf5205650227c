//! In-memory transcript of an upload
//!
//! [`TranscriptRecorder`] keeps every progress event in order. The plain
//! text rendering is what a front end shows as the full explanation of an
//! upload; callers add whatever escaping their medium needs.

use crate::error::StepError;
use crate::pipeline::progress::{ProgressCallback, StdinEcho, Step};
use crate::types::{CommandStep, PipelineOutcome};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Write;
use std::sync::{Mutex, PoisonError};

/// One recorded event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TranscriptEntry {
    /// A step began
    Step {
        /// Which step
        step: Step,
    },
    /// A command is about to run
    CommandStarted {
        /// Space-joined argv
        command_line: String,
        /// Stdin echo, if the command reads stdin
        stdin: Option<StdinEcho>,
    },
    /// A command finished
    CommandFinished {
        /// Space-joined argv
        command_line: String,
        /// Exit code
        exit_code: i32,
        /// Cleaned combined output
        output: String,
    },
    /// Status message
    Message {
        /// Text
        text: String,
    },
    /// Review URLs from the push
    ReviewUrls {
        /// URLs in order of appearance
        urls: Vec<String>,
    },
    /// Non-fatal failure
    Warning {
        /// User-facing reason
        reason: String,
    },
    /// The upload failed
    Failure {
        /// Failure kind
        kind: String,
        /// User-facing reason
        reason: String,
    },
    /// Final outcome
    Complete {
        /// Outcome
        outcome: PipelineOutcome,
    },
}

/// Progress callback that records events
#[derive(Debug, Default)]
pub struct TranscriptRecorder {
    entries: Mutex<Vec<TranscriptEntry>>,
}

impl TranscriptRecorder {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: TranscriptEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Snapshot of the events so far
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Command lines in the order they ran
    pub fn command_lines(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                TranscriptEntry::CommandStarted { command_line, .. } => Some(command_line),
                _ => None,
            })
            .collect()
    }

    /// Plain-text transcript
    pub fn render(&self) -> String {
        let mut out = String::from("Result from uploading patch:\n");
        for entry in self.entries() {
            match entry {
                TranscriptEntry::Step { .. } => {}
                TranscriptEntry::CommandStarted {
                    command_line,
                    stdin,
                } => match stdin {
                    Some(StdinEcho::Source(name)) => {
                        let _ = writeln!(out, "$ {command_line} < {name}");
                    }
                    Some(StdinEcho::Inline(text)) => {
                        let _ = writeln!(out, "$ {command_line}");
                        for line in text.lines() {
                            let _ = writeln!(out, "    | {line}");
                        }
                    }
                    None => {
                        let _ = writeln!(out, "$ {command_line}");
                    }
                },
                TranscriptEntry::CommandFinished { output, .. } => {
                    out.push_str(&output);
                    if !output.is_empty() && !output.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str("----\n");
                }
                TranscriptEntry::Message { text } => {
                    let _ = writeln!(out, "{text}");
                }
                TranscriptEntry::ReviewUrls { urls } => {
                    out.push_str("Uploaded patches:\n");
                    for url in urls {
                        let _ = writeln!(out, "  * {url}");
                    }
                }
                TranscriptEntry::Warning { reason } => {
                    let _ = writeln!(out, "Warning: {reason}");
                }
                TranscriptEntry::Failure { reason, .. } => {
                    out.push_str("Upload failed\n");
                    let _ = writeln!(out, "Reason: {reason} (check log above for details)");
                }
                TranscriptEntry::Complete { outcome } => {
                    if let Some(url) = outcome.redirect_url {
                        let _ = writeln!(out, "Single change created: {url}");
                    }
                }
            }
        }
        out
    }
}

#[async_trait]
impl ProgressCallback for TranscriptRecorder {
    async fn on_step(&self, step: Step) {
        self.push(TranscriptEntry::Step { step });
    }

    async fn on_command_started(&self, command_line: &str, stdin: Option<&StdinEcho>) {
        self.push(TranscriptEntry::CommandStarted {
            command_line: command_line.to_string(),
            stdin: stdin.cloned(),
        });
    }

    async fn on_command_finished(&self, command: &CommandStep) {
        self.push(TranscriptEntry::CommandFinished {
            command_line: command.command_line(),
            exit_code: command.exit_code,
            output: command.output.clone(),
        });
    }

    async fn on_message(&self, message: &str) {
        self.push(TranscriptEntry::Message {
            text: message.to_string(),
        });
    }

    async fn on_review_urls(&self, urls: &[String]) {
        self.push(TranscriptEntry::ReviewUrls {
            urls: urls.to_vec(),
        });
    }

    async fn on_warning(&self, error: &StepError) {
        self.push(TranscriptEntry::Warning {
            reason: error.to_string(),
        });
    }

    async fn on_failure(&self, error: &StepError) {
        self.push(TranscriptEntry::Failure {
            kind: error.kind().to_string(),
            reason: error.to_string(),
        });
    }

    async fn on_complete(&self, outcome: &PipelineOutcome) {
        self.push(TranscriptEntry::Complete {
            outcome: outcome.clone(),
        });
    }
}
