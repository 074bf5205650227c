//! patch-uploader - upload a patch to Gerrit on someone's behalf
//!
//! CLI binary wrapping the upload pipeline.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use patch_uploader::Config;
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser)]
#[command(name = "patch-uploader")]
#[command(about = "Apply a patch to a fresh clone and upload it to Gerrit for review")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/patch-uploader/config.toml)
    #[arg(long, global = true, env = "PATCH_UPLOADER_CONFIG")]
    config: Option<PathBuf>,

    /// More log output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a patch to a fresh clone and push it for review
    Upload(cli::UploadArgs),

    /// List projects known to the review server
    Projects {
        /// Only show projects containing this text
        filter: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose, cli.log_json);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Upload(args) => {
            if cli::run_upload(config, args).await? {
                return Ok(ExitCode::SUCCESS);
            }
            return Ok(ExitCode::FAILURE);
        }
        Commands::Projects { filter } => {
            cli::run_projects(&config, filter.as_deref()).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
