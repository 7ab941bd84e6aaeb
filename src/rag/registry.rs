//! Per-user collection naming and lifecycle.
//!
//! Maps a user identifier to its vector collection and guarantees the
//! collection exists before use. Naming is deterministic so retrieval and
//! deletion always target the collection ingestion created.

use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::rag::index::{Distance, VectorIndex};

/// Derive the collection name for a user.
///
/// Characters outside `[A-Za-z0-9_-]` are replaced with `_`; collisions
/// between distinct unsafe ids are accepted as negligible.
pub fn collection_name_for(user_id: &str) -> String {
    let safe: String = user_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("user_{safe}_data")
}

pub struct CollectionRegistry {
    index: Arc<dyn VectorIndex>,
    dimension: usize,
}

impl CollectionRegistry {
    pub fn new(index: Arc<dyn VectorIndex>, dimension: usize) -> Self {
        Self { index, dimension }
    }

    /// Create the user's collection if absent. Returns the collection name.
    ///
    /// Concurrent callers may both observe the collection as missing; the
    /// index treats the duplicate create as success, so both callers end up
    /// with exactly one collection.
    pub async fn ensure_exists(&self, user_id: &str) -> Result<String, ApiError> {
        let name = collection_name_for(user_id);
        let existing = self.index.list_collections().await?;
        if !existing.contains(&name) {
            tracing::info!("creating collection for user {user_id}: {name}");
            self.index
                .create_collection(&name, self.dimension, Distance::Cosine)
                .await?;
        }
        Ok(name)
    }

    /// Existence check with no side effects.
    pub async fn exists(&self, user_id: &str) -> Result<bool, ApiError> {
        let name = collection_name_for(user_id);
        let existing = self.index.list_collections().await?;
        Ok(existing.contains(&name))
    }

    /// Delete the user's collection if present. Returns whether a deletion
    /// occurred.
    pub async fn delete(&self, user_id: &str) -> Result<bool, ApiError> {
        let name = collection_name_for(user_id);
        if !self.exists(user_id).await? {
            return Ok(false);
        }
        let deleted = self.index.delete_collection(&name).await?;
        if deleted {
            tracing::info!("deleted collection for user {user_id}");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::memory::MemoryIndex;

    #[test]
    fn naming_is_deterministic_and_sanitized() {
        assert_eq!(collection_name_for("alice"), "user_alice_data");
        assert_eq!(collection_name_for("alice"), collection_name_for("alice"));
        assert_eq!(
            collection_name_for("a.b@example!"),
            "user_a_b_example__data"
        );
        assert_eq!(collection_name_for("u-1_x"), "user_u-1_x_data");
    }

    #[test]
    fn distinct_safe_ids_yield_distinct_names() {
        assert_ne!(collection_name_for("alice"), collection_name_for("bob"));
    }

    #[tokio::test]
    async fn ensure_exists_is_idempotent() {
        let index = Arc::new(MemoryIndex::new());
        let registry = CollectionRegistry::new(index.clone(), 4);

        let first = registry.ensure_exists("u1").await.unwrap();
        let second = registry.ensure_exists("u1").await.unwrap();
        assert_eq!(first, second);

        let collections = index.list_collections().await.unwrap();
        assert_eq!(collections.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_ensure_exists_creates_one_collection() {
        let index = Arc::new(MemoryIndex::new());
        let registry = Arc::new(CollectionRegistry::new(index.clone(), 4));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(
                async move { registry.ensure_exists("u1").await },
            ));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(index.list_collections().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let index = Arc::new(MemoryIndex::new());
        let registry = CollectionRegistry::new(index, 4);

        assert!(!registry.delete("ghost").await.unwrap());
        registry.ensure_exists("u1").await.unwrap();
        assert!(registry.delete("u1").await.unwrap());
        assert!(!registry.exists("u1").await.unwrap());
    }
}
