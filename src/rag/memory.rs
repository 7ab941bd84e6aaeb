//! In-process vector index.
//!
//! Brute-force cosine similarity over collections held in a mutex-guarded
//! map. No external server required; used when no Qdrant endpoint is
//! configured, and by the test suite.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::errors::ApiError;
use crate::rag::index::{Distance, IndexPoint, ScoredPoint, VectorIndex};

struct Collection {
    dimension: usize,
    points: Vec<IndexPoint>,
}

#[derive(Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn list_collections(&self) -> Result<Vec<String>, ApiError> {
        let collections = self.collections.read().await;
        Ok(collections.keys().cloned().collect())
    }

    async fn create_collection(
        &self,
        name: &str,
        dimension: usize,
        _distance: Distance,
    ) -> Result<(), ApiError> {
        let mut collections = self.collections.write().await;
        // Duplicate create is a no-op, matching the race tolerance the
        // registry relies on.
        collections.entry(name.to_string()).or_insert(Collection {
            dimension,
            points: Vec::new(),
        });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, ApiError> {
        let mut collections = self.collections.write().await;
        Ok(collections.remove(name).is_some())
    }

    async fn upsert(&self, collection: &str, points: Vec<IndexPoint>) -> Result<(), ApiError> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| ApiError::NotFound(format!("collection {collection} not found")))?;

        for point in &points {
            if point.vector.len() != entry.dimension {
                return Err(ApiError::BadRequest(format!(
                    "vector dimension {} does not match collection dimension {}",
                    point.vector.len(),
                    entry.dimension
                )));
            }
        }

        for point in points {
            if let Some(existing) = entry.points.iter_mut().find(|p| p.id == point.id) {
                *existing = point;
            } else {
                entry.points.push(point);
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, ApiError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| ApiError::NotFound(format!("collection {collection} not found")))?;

        let mut scored: Vec<ScoredPoint> = entry
            .points
            .iter()
            .map(|p| ScoredPoint {
                text: p.text.clone(),
                source: p.source.clone(),
                score: cosine_similarity(vector, &p.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, vector: Vec<f32>, text: &str) -> IndexPoint {
        IndexPoint {
            id: id.to_string(),
            vector,
            text: text.to_string(),
            source: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let index = MemoryIndex::new();
        index.create_collection("c", 3, Distance::Cosine).await.unwrap();
        index
            .upsert("c", vec![point("p1", vec![1.0, 0.0, 0.0], "hello")])
            .await
            .unwrap();
        index.create_collection("c", 3, Distance::Cosine).await.unwrap();

        let hits = index.search("c", &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1, "duplicate create must not wipe data");
    }

    #[tokio::test]
    async fn search_ranks_descending_and_respects_top_k() {
        let index = MemoryIndex::new();
        index.create_collection("c", 2, Distance::Cosine).await.unwrap();
        index
            .upsert(
                "c",
                vec![
                    point("a", vec![1.0, 0.0], "exact"),
                    point("b", vec![0.7, 0.7], "diagonal"),
                    point("c", vec![0.0, 1.0], "orthogonal"),
                ],
            )
            .await
            .unwrap();

        let hits = index.search("c", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "exact");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_id() {
        let index = MemoryIndex::new();
        index.create_collection("c", 2, Distance::Cosine).await.unwrap();
        index
            .upsert("c", vec![point("p", vec![1.0, 0.0], "old")])
            .await
            .unwrap();
        index
            .upsert("c", vec![point("p", vec![1.0, 0.0], "new")])
            .await
            .unwrap();

        let hits = index.search("c", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "new");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let index = MemoryIndex::new();
        index.create_collection("c", 3, Distance::Cosine).await.unwrap();
        let result = index.upsert("c", vec![point("p", vec![1.0], "short")]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn delete_reports_whether_collection_existed() {
        let index = MemoryIndex::new();
        index.create_collection("c", 2, Distance::Cosine).await.unwrap();
        assert!(index.delete_collection("c").await.unwrap());
        assert!(!index.delete_collection("c").await.unwrap());
    }
}
