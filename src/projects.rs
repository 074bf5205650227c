//! Known-project lookup
//!
//! The front end must check the requested project against the server's
//! project list before starting an upload. The list is slow to fetch and
//! rarely changes, so [`CachedProjectCatalog`] keeps it for a fixed time.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::runner::{CommandRunner, CommandSpec};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Source of the known project names
#[async_trait]
pub trait ProjectCatalog: Send + Sync {
    /// All known projects
    async fn projects(&self) -> Result<Arc<Vec<String>>>;

    /// Fail with [`Error::UnknownProject`] unless `project` is known
    async fn ensure_known(&self, project: &str) -> Result<()> {
        if self.projects().await?.iter().any(|p| p == project) {
            Ok(())
        } else {
            Err(Error::UnknownProject(project.to_string()))
        }
    }
}

/// Fixed project list
#[derive(Debug, Clone, Default)]
pub struct StaticProjectCatalog {
    projects: Arc<Vec<String>>,
}

impl StaticProjectCatalog {
    /// Catalog holding exactly `projects`
    pub fn new<I, S>(projects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            projects: Arc::new(projects.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl ProjectCatalog for StaticProjectCatalog {
    async fn projects(&self) -> Result<Arc<Vec<String>>> {
        Ok(Arc::clone(&self.projects))
    }
}

struct CachedList {
    fetched_at: Instant,
    projects: Arc<Vec<String>>,
}

/// Project list fetched with `ssh <review_host> gerrit ls-projects`
///
/// Refetched lazily once the cached copy is older than the TTL. Concurrent
/// callers wait on the same fetch rather than each running their own.
pub struct CachedProjectCatalog {
    runner: Arc<dyn CommandRunner>,
    command: CommandSpec,
    ttl: Duration,
    cache: Mutex<Option<CachedList>>,
}

impl CachedProjectCatalog {
    /// Catalog for the configured review host
    pub fn new(config: &Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            command: CommandSpec::new(&config.ssh_path)
                .args([config.review_host.clone(), "gerrit ls-projects".to_string()]),
            ttl: config.project_cache_ttl(),
            cache: Mutex::new(None),
        }
    }

    /// Drop the cached list so the next lookup refetches
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    async fn fetch(&self) -> Result<Vec<String>> {
        let dir = std::env::temp_dir();
        let out = self.runner.run(&dir, &self.command).await;
        if out.exit_code != 0 {
            return Err(Error::Catalog(format!(
                "{} exited with {}: {}",
                self.command.argv().join(" "),
                out.exit_code,
                out.output.trim()
            )));
        }
        Ok(parse_project_list(&out.output))
    }
}

#[async_trait]
impl ProjectCatalog for CachedProjectCatalog {
    async fn projects(&self) -> Result<Arc<Vec<String>>> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.projects));
            }
        }

        debug!("fetching project list");
        let projects = Arc::new(self.fetch().await?);
        *cache = Some(CachedList {
            fetched_at: Instant::now(),
            projects: Arc::clone(&projects),
        });
        Ok(projects)
    }
}

/// One project per line, blank lines ignored
pub fn parse_project_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRunner {
        calls: AtomicUsize,
        output: CommandOutput,
    }

    #[async_trait]
    impl CommandRunner for CountingRunner {
        async fn run(&self, _dir: &Path, _command: &CommandSpec) -> CommandOutput {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.output.clone()
        }
    }

    fn catalog(ttl_secs: u64, output: CommandOutput) -> (CachedProjectCatalog, Arc<CountingRunner>) {
        let runner = Arc::new(CountingRunner {
            calls: AtomicUsize::new(0),
            output,
        });
        let config = Config {
            project_cache_ttl_secs: ttl_secs,
            ..Config::default()
        };
        (CachedProjectCatalog::new(&config, runner.clone()), runner)
    }

    #[test]
    fn test_parse_project_list() {
        assert_eq!(
            parse_project_list("All-Projects\nmediawiki/core\n\n  operations/puppet \n"),
            vec!["All-Projects", "mediawiki/core", "operations/puppet"]
        );
    }

    #[tokio::test]
    async fn test_list_is_cached_within_ttl() {
        let (catalog, runner) = catalog(3600, CommandOutput::new(0, "a\nb\n"));
        assert_eq!(catalog.projects().await.unwrap().len(), 2);
        assert_eq!(catalog.projects().await.unwrap().len(), 2);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);

        catalog.invalidate().await;
        catalog.projects().await.unwrap();
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_refetches() {
        let (catalog, runner) = catalog(0, CommandOutput::new(0, "a\n"));
        catalog.projects().await.unwrap();
        catalog.projects().await.unwrap();
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ensure_known() {
        let (catalog, _) = catalog(3600, CommandOutput::new(0, "demo/repo\n"));
        assert!(catalog.ensure_known("demo/repo").await.is_ok());
        let err = catalog.ensure_known("demo/other").await.unwrap_err();
        assert!(matches!(err, Error::UnknownProject(p) if p == "demo/other"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_cached() {
        let (catalog, runner) = catalog(3600, CommandOutput::new(255, "ssh: connect refused"));
        assert!(matches!(catalog.projects().await, Err(Error::Catalog(_))));
        assert!(catalog.projects().await.is_err());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_static_catalog() {
        let catalog = StaticProjectCatalog::new(["demo/repo"]);
        assert!(catalog.ensure_known("demo/repo").await.is_ok());
        assert!(catalog.ensure_known("nope").await.is_err());
    }
}
