//! Runtime configuration.
//!
//! Settings come from environment variables with defaults that match a
//! local development setup. Chunking parameters are validated once at
//! startup; a bad combination is fatal there rather than per-request.

use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::errors::ApiError;

/// Embedding dimensionality fixed at collection-creation time.
pub const EMBEDDING_DIMENSION: usize = 3072;

/// Similarity scores below this are discarded at retrieval time.
pub const SCORE_THRESHOLD: f32 = 0.6;

/// Default number of chunks per upsert request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default number of candidates requested from the index per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Default number of past exchanges fed back into the prompt.
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;

#[derive(Debug, Clone)]
pub struct Settings {
    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub upsert_batch_size: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ApiError> {
        let settings = Settings {
            qdrant_url: env::var("QDRANT_URL").ok().filter(|v| !v.is_empty()),
            qdrant_api_key: env::var("QDRANT_API_KEY").ok().filter(|v| !v.is_empty()),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|v| !v.is_empty()),
            chunk_size: env_usize("CHUNK_SIZE", 800),
            chunk_overlap: env_usize("CHUNK_OVERLAP", 100),
            upsert_batch_size: env_usize("UPSERT_BATCH_SIZE", DEFAULT_BATCH_SIZE),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.chunk_size == 0 {
            return Err(ApiError::Config("chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ApiError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.upsert_batch_size == 0 {
            return Err(ApiError::Config(
                "upsert_batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

/// Filesystem layout for runtime data.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
    pub staging_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let data_dir = env::var("SCRIBA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        let log_dir = data_dir.join("logs");
        let db_path = data_dir.join("scriba.db");
        let staging_dir = data_dir.join("staging");

        for dir in [&data_dir, &log_dir, &staging_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            data_dir,
            log_dir,
            db_path,
            staging_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
