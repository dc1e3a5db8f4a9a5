//! Output workspace
//!
//! The directory the segmenter writes into and the file server reads from.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::WorkspaceError;

#[derive(Debug, Clone)]
pub struct OutputWorkspace {
    path: PathBuf,
}

impl OutputWorkspace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the workspace
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Wipe and recreate the directory. Idempotent: always leaves an empty,
    /// existing directory behind.
    pub async fn prepare(&self) -> Result<(), WorkspaceError> {
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => tracing::debug!("Removed stale workspace {:?}", self.path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(WorkspaceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        }

        tokio::fs::create_dir_all(&self.path)
            .await
            .map_err(|source| WorkspaceError::Io {
                path: self.path.clone(),
                source,
            })?;

        tracing::info!("Prepared output directory {:?}", self.path);
        Ok(())
    }
}
