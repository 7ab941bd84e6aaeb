//! Vector index abstraction.
//!
//! The only contact surface with the underlying vector database. The gateway
//! and registry talk to a `VectorIndex` trait object; concrete backends are
//! the Qdrant REST client and an in-process memory index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// Similarity metric fixed at collection-creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
}

impl Distance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
        }
    }
}

/// A chunk ready for upsert: id, embedding, and payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub source: String,
}

/// A similarity-search hit, best matches first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// Abstract vector database operations.
///
/// Implementations must treat a duplicate `create_collection` as success:
/// concurrent callers race on the existence check and the loser's create
/// must not surface as an error.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<String>, ApiError>;

    async fn create_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), ApiError>;

    /// Delete a collection. Returns whether a deletion occurred.
    async fn delete_collection(&self, name: &str) -> Result<bool, ApiError>;

    /// Upsert a batch of points. All-or-nothing per batch.
    async fn upsert(&self, collection: &str, points: Vec<IndexPoint>) -> Result<(), ApiError>;

    /// Similarity search, ranked best-first, at most `top_k` hits.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, ApiError>;
}
