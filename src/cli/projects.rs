//! Projects command - list projects known to the review server

use anstream::println;
use patch_uploader::error::Result;
use patch_uploader::projects::{CachedProjectCatalog, ProjectCatalog};
use patch_uploader::runner::ProcessRunner;
use patch_uploader::Config;
use std::sync::Arc;

/// Print known projects, optionally only those containing `filter`
pub async fn run_projects(config: &Config, filter: Option<&str>) -> Result<()> {
    let runner = Arc::new(ProcessRunner::new(config.env.clone()));
    let catalog = CachedProjectCatalog::new(config, runner);

    for project in catalog.projects().await?.iter() {
        if filter.is_none_or(|f| project.contains(f)) {
            println!("{project}");
        }
    }
    Ok(())
}
