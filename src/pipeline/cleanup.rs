//! Scoped ownership of the staged upload.

use std::path::{Path, PathBuf};

/// Owns a staged upload and deletes it when released or dropped.
///
/// The engine calls [`StagedFile::remove`] on every normal exit so failures
/// are logged; `Drop` covers panics and dropped futures.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    /// Take ownership of the file at `path`.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now.  A file that is already gone counts as removed.
    pub async fn remove(mut self) -> std::io::Result<()> {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("pipeline: removed staged file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "pipeline: could not remove staged file {}: {e}",
                self.path.display()
            ),
        }
    }
}
