//! patch-uploader - apply a patch to a fresh clone and upload it to Gerrit
//!
//! The library holds the upload pipeline (clone, configure, apply, commit,
//! push, annotate) and the seams it talks through: a [`runner::CommandRunner`]
//! for external processes, a [`pipeline::ProgressCallback`] for the live
//! transcript, and a [`projects::ProjectCatalog`] for known projects.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod projects;
pub mod runner;
pub mod types;
pub mod workspace;

pub use config::Config;
pub use error::{Error, Result, StepError};
pub use pipeline::Uploader;
pub use types::{PipelineOutcome, PipelineRequest};
