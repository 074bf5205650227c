//! Upload command - apply a patch and push it for review

use crate::cli::progress::CliProgress;
use anyhow::Context;
use clap::Args;
use patch_uploader::pipeline::TranscriptRecorder;
use patch_uploader::projects::{CachedProjectCatalog, ProjectCatalog};
use patch_uploader::runner::ProcessRunner;
use patch_uploader::{Config, PipelineOutcome, PipelineRequest, Uploader};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Arguments for `upload`
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Gerrit project (e.g. mediawiki/core)
    #[arg(short, long)]
    project: String,

    /// Submitter's wiki username
    #[arg(short, long, env = "PATCH_UPLOADER_USER")]
    user: String,

    /// Commit author name
    #[arg(long)]
    name: String,

    /// Commit author email
    #[arg(long)]
    email: String,

    /// Commit message
    #[arg(short, long, conflicts_with = "message_file", required_unless_present = "message_file")]
    message: Option<String>,

    /// Read the commit message from a file
    #[arg(long)]
    message_file: Option<PathBuf>,

    /// Patch file in unified diff format ("-" or omitted reads stdin)
    #[arg(long)]
    patch: Option<PathBuf>,

    /// Custom provenance note instead of the configured one
    #[arg(long, conflicts_with = "no_note")]
    note: Option<String>,

    /// Don't post a provenance note on the change
    #[arg(long)]
    no_note: bool,

    /// Don't check the project against the server's project list
    #[arg(long)]
    skip_project_check: bool,

    /// Print the outcome and transcript as JSON instead of styled text
    #[arg(long)]
    json: bool,
}

/// Run the upload command
///
/// Returns whether the patch reached Gerrit.
pub async fn run_upload(config: Config, args: UploadArgs) -> anyhow::Result<bool> {
    let message = match (&args.message, &args.message_file) {
        (Some(m), _) => m.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read message file {}", path.display()))?,
        (None, None) => String::new(),
    };
    let patch = read_patch(args.patch.as_deref()).await?;

    let mut request = PipelineRequest {
        submitter: args.user,
        project: args.project,
        committer_name: args.name,
        committer_email: args.email,
        message: message.replace("\r\n", "\n"),
        patch,
        provenance_note: None,
    };
    request.validate()?;
    if !args.no_note {
        request.provenance_note = Some(
            args.note
                .unwrap_or_else(|| config.note_for(&request.author())),
        );
    }

    let runner = Arc::new(ProcessRunner::new(config.env.clone()));
    if !args.skip_project_check {
        CachedProjectCatalog::new(&config, runner.clone())
            .ensure_known(&request.project)
            .await?;
    }

    let uploader = Uploader::new(config, runner);
    let outcome = if args.json {
        let recorder = TranscriptRecorder::new();
        let outcome = uploader.upload(&request, &recorder).await;
        print_json(&outcome, &recorder)?;
        outcome
    } else {
        uploader.upload(&request, &CliProgress::new()).await
    };

    Ok(outcome.succeeded)
}

async fn read_patch(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(p) if p != Path::new("-") => tokio::fs::read(p)
            .await
            .with_context(|| format!("failed to read patch file {}", p.display())),
        _ => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("failed to read patch from stdin")?;
            Ok(buf)
        }
    }
}

fn print_json(outcome: &PipelineOutcome, recorder: &TranscriptRecorder) -> anyhow::Result<()> {
    let doc = json!({
        "outcome": outcome,
        "transcript": recorder.entries(),
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
