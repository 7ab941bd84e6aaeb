//! Vector store gateway.
//!
//! The only component that touches the embedding model and the vector
//! index. Scopes every operation to the calling user's collection and keeps
//! a per-user handle cache so repeat callers skip the name derivation and
//! existence bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::config::SCORE_THRESHOLD;
use crate::core::errors::ApiError;
use crate::llm::EmbeddingProvider;
use crate::rag::chunker::TextChunker;
use crate::rag::index::{IndexPoint, VectorIndex};
use crate::rag::registry::CollectionRegistry;

/// A document submitted for ingestion: raw text plus its source identifier.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub text: String,
    pub source: String,
}

/// A retrieval hit at or above the score threshold, ranked best-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedMatch {
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// Cached per-user binding of user id to collection name.
///
/// Construction is cheap and idempotent, so two tasks racing to build the
/// same handle is tolerated; one of them simply wins the cache slot.
struct UserHandle {
    collection: String,
}

pub struct VectorStoreGateway {
    embeddings: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    registry: CollectionRegistry,
    chunker: TextChunker,
    handles: RwLock<HashMap<String, Arc<UserHandle>>>,
}

impl VectorStoreGateway {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        chunker: TextChunker,
        dimension: usize,
    ) -> Self {
        Self {
            embeddings,
            registry: CollectionRegistry::new(index.clone(), dimension),
            index,
            chunker,
            handles: RwLock::new(HashMap::new()),
        }
    }

    async fn user_handle(&self, user_id: &str) -> Result<Arc<UserHandle>, ApiError> {
        if let Some(handle) = self.handles.read().await.get(user_id) {
            return Ok(handle.clone());
        }

        let collection = self.registry.ensure_exists(user_id).await?;
        let handle = Arc::new(UserHandle { collection });
        self.handles
            .write()
            .await
            .insert(user_id.to_string(), handle.clone());
        Ok(handle)
    }

    /// Chunk, embed, and upsert documents into the user's collection.
    ///
    /// Returns the number of chunks inserted, or 0 without contacting the
    /// index when the documents produce no chunks. A failed batch aborts
    /// the whole operation; no partial count is reported.
    pub async fn add_documents(
        &self,
        user_id: &str,
        documents: &[DocumentInput],
        batch_size: usize,
    ) -> Result<usize, ApiError> {
        let mut chunks: Vec<(String, String)> = Vec::new();
        for doc in documents {
            for segment in self.chunker.split(&doc.text) {
                chunks.push((segment, doc.source.clone()));
            }
        }
        if chunks.is_empty() {
            return Ok(0);
        }

        let handle = self.user_handle(user_id).await?;
        let total = chunks.len();
        tracing::info!("upserting {total} chunks for user {user_id}");

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|(text, _)| text.clone()).collect();
            let vectors = self.embeddings.embed(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(ApiError::Upstream(format!(
                    "embedding provider returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }

            let points: Vec<IndexPoint> = batch
                .iter()
                .zip(vectors)
                .map(|((text, source), vector)| IndexPoint {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    text: text.clone(),
                    source: source.clone(),
                })
                .collect();
            self.index.upsert(&handle.collection, points).await?;
        }

        Ok(total)
    }

    /// Similarity search scoped to the user's collection.
    ///
    /// A user with no collection gets an empty result, not an error. Hits
    /// below the score threshold are discarded; the index's ranking order
    /// is preserved.
    pub async fn retrieve(
        &self,
        user_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedMatch>, ApiError> {
        if !self.registry.exists(user_id).await? {
            tracing::info!("no collection for user {user_id}");
            return Ok(Vec::new());
        }

        let handle = self.user_handle(user_id).await?;
        let query_vec = self
            .embeddings
            .embed(std::slice::from_ref(&query.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("no embedding for query".to_string()))?;

        let hits = self
            .index
            .search(&handle.collection, &query_vec, top_k)
            .await?;
        Ok(hits
            .into_iter()
            .filter(|hit| hit.score >= SCORE_THRESHOLD)
            .map(|hit| RetrievedMatch {
                text: hit.text,
                source: hit.source,
                score: hit.score,
            })
            .collect())
    }

    /// Drop the user's collection and evict the cached handle.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<bool, ApiError> {
        let deleted = self.registry.delete(user_id).await?;
        self.handles.write().await.remove(user_id);
        Ok(deleted)
    }
}
