//! Service configuration
//!
//! Defaults match the original Wikimedia deployment. A TOML file can
//! override any field, and `PATCH_UPLOADER_*` environment variables override
//! the file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default provenance note; `{author}` is replaced with `Name <email>`
pub const DEFAULT_NOTE_TEMPLATE: &str = "This commit was uploaded using the Gerrit Patch Uploader [1].

Please contact the patch author, {author}, for questions/improvements.

[1] https://tools.wmflabs.org/gerrit-patch-uploader/";

/// Upload service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `git` executable
    pub git_path: String,
    /// `patch` executable
    pub patch_path: String,
    /// `ssh` executable
    pub ssh_path: String,
    /// Prefix the project name is appended to when cloning
    pub remote_base: String,
    /// ssh host (or alias) that accepts `gerrit ...` commands
    pub review_host: String,
    /// Review URLs in the push output start with this
    pub review_url_prefix: String,
    /// Email of the service account recorded as committer
    pub committer_email: String,
    /// `user.name` for the clone; `{user}` is replaced with the submitter
    pub identity_template: String,
    /// Provenance note template; `{author}` is replaced with `Name <email>`
    pub note_template: String,
    /// Parent directory for workspaces (system temp dir when unset)
    pub workspace_root: Option<PathBuf>,
    /// How long the project list is cached, in seconds
    pub project_cache_ttl_secs: u64,
    /// Extra environment for every child process
    pub env: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git_path: "git".to_string(),
            patch_path: "patch".to_string(),
            ssh_path: "ssh".to_string(),
            remote_base: "ssh://gerrit/".to_string(),
            review_host: "gerrit".to_string(),
            review_url_prefix: "https://gerrit.wikimedia.org/".to_string(),
            committer_email: "gerrit-patch-uploader@tools.wmflabs.org".to_string(),
            identity_template: "[[mw:User:{user}]]".to_string(),
            note_template: DEFAULT_NOTE_TEMPLATE.to_string(),
            workspace_root: None,
            project_cache_ttl_secs: 3600,
            env: BTreeMap::from([("LANG".to_string(), "en_US.UTF-8".to_string())]),
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// Priority (highest first):
    /// 1. `PATCH_UPLOADER_*` environment variables
    /// 2. The file at `path`, or the default config file if it exists
    /// 3. Built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.is_file() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self) {
        self.apply_env_from(|var| env::var(var).ok());
    }

    /// Apply `PATCH_UPLOADER_*` overrides looked up through `get`
    fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        let overrides: [(&str, &mut String); 7] = [
            ("PATCH_UPLOADER_GIT", &mut self.git_path),
            ("PATCH_UPLOADER_PATCH", &mut self.patch_path),
            ("PATCH_UPLOADER_SSH", &mut self.ssh_path),
            ("PATCH_UPLOADER_REMOTE_BASE", &mut self.remote_base),
            ("PATCH_UPLOADER_REVIEW_HOST", &mut self.review_host),
            ("PATCH_UPLOADER_REVIEW_URL_PREFIX", &mut self.review_url_prefix),
            ("PATCH_UPLOADER_COMMITTER_EMAIL", &mut self.committer_email),
        ];
        for (var, field) in overrides {
            if let Some(value) = get(var) {
                *field = value;
            }
        }
        if let Some(root) = get("PATCH_UPLOADER_WORKSPACE_ROOT") {
            self.workspace_root = Some(PathBuf::from(root));
        }
    }

    /// Check values that would otherwise fail deep inside an upload
    pub fn validate(&self) -> Result<()> {
        let prefix = url::Url::parse(&self.review_url_prefix).map_err(|e| {
            Error::Config(format!(
                "review_url_prefix {:?} is not a URL: {e}",
                self.review_url_prefix
            ))
        })?;
        if !matches!(prefix.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "review_url_prefix must be http(s), got {}",
                prefix.scheme()
            )));
        }
        if self.remote_base.trim().is_empty() {
            return Err(Error::Config("remote_base is empty".to_string()));
        }
        if !self.identity_template.contains("{user}") {
            return Err(Error::Config(
                "identity_template must contain {user}".to_string(),
            ));
        }
        if self.committer_email.trim().is_empty() {
            return Err(Error::Config("committer_email is empty".to_string()));
        }
        Ok(())
    }

    /// Clone URL for a project
    pub fn clone_url(&self, project: &str) -> String {
        format!("{}{project}", self.remote_base)
    }

    /// `user.name` recorded in the clone for a submitter
    pub fn identity_for(&self, submitter: &str) -> String {
        self.identity_template.replace("{user}", submitter)
    }

    /// Provenance note for an author string
    pub fn note_for(&self, author: &str) -> String {
        self.note_template.replace("{author}", author)
    }

    /// Project list cache lifetime
    pub const fn project_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.project_cache_ttl_secs)
    }
}

/// `<config dir>/patch-uploader/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("patch-uploader").join("config.toml"))
}
