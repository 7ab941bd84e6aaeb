//! Text extraction seam.
//!
//! Ingestion only needs "file path in, plain text out"; the concrete
//! decoder lives behind this trait. An extraction failure aborts the job.

use std::path::Path;

use async_trait::async_trait;

use crate::core::errors::ApiError;

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String, ApiError>;
}

/// Reads the staged file as UTF-8 text.
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ApiError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ApiError::Internal(format!("text extraction failed: {e}")))
    }
}
