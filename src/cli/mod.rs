//! CLI commands
//!
//! Command implementations for the `patch-uploader` binary.

mod logging;
mod progress;
mod projects;
mod style;
mod upload;

pub use logging::init_tracing;
pub use projects::run_projects;
pub use upload::{run_upload, UploadArgs};
