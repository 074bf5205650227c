//! Per-upload working directories

use crate::error::StepError;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, error};

const WORKSPACE_PREFIX: &str = "patch-uploader-";

/// An empty directory owned by exactly one upload
///
/// Removed by [`Workspace::release`] on the normal path and by `Drop` if the
/// upload unwinds before getting there.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `root`, or the system temp dir
    pub fn acquire(root: Option<&Path>) -> Result<Self, StepError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| StepError::WorkspaceUnavailable(format!("cannot allocate workspace: {e}")))?;

        debug!(path = %dir.path().display(), "acquired workspace");
        Ok(Self { dir })
    }

    /// Directory path
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory and everything in it
    ///
    /// A removal failure is only a warning for the caller, since the upload
    /// itself is already decided by then.
    pub fn release(self) -> Result<(), StepError> {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => {
                debug!(path = %path.display(), "released workspace");
                Ok(())
            }
            Err(e) => {
                error!(path = %path.display(), "failed to remove workspace: {e}");
                Err(StepError::WorkspaceUnavailable(format!(
                    "cannot remove {}: {e}",
                    path.display()
                )))
            }
        }
    }
}
