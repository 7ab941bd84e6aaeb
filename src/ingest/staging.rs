//! Staged upload files.
//!
//! An uploaded document is written to the staging directory and handed to
//! the background task as a `StagedFile`. Dropping the guard removes the
//! file, so every exit path of the task releases it exactly once.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::core::errors::ApiError;

#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// Write `bytes` to a fresh file under `staging_dir`.
    pub async fn create(staging_dir: &Path, bytes: &[u8]) -> Result<Self, ApiError> {
        tokio::fs::create_dir_all(staging_dir)
            .await
            .map_err(ApiError::internal)?;
        let path = staging_dir.join(format!("upload-{}", Uuid::new_v4()));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("failed to stage upload: {e}")))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("failed to clean up staged file {:?}: {err}", self.path);
            }
        } else {
            tracing::debug!("cleaned up staged file {:?}", self.path);
        }
    }
}
