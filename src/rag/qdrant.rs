//! Qdrant REST backend for the vector index.
//!
//! Talks to Qdrant over its HTTP API: collection management under
//! `/collections/{name}` and point upsert/search under
//! `/collections/{name}/points`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::index::{Distance, IndexPoint, ScoredPoint, VectorIndex};

pub struct QdrantIndex {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantIndex {
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn error_body(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        format!("qdrant returned {status}: {body}")
    }
}

#[derive(Deserialize)]
struct CollectionsResponse {
    result: CollectionsResult,
}

#[derive(Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Deserialize)]
struct DeleteResponse {
    result: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    score: f32,
    payload: Option<serde_json::Value>,
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn list_collections(&self) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/collections", self.base_url);
        let response = self
            .request(self.http.get(url))
            .send()
            .await
            .map_err(ApiError::upstream)?;
        if !response.status().is_success() {
            return Err(ApiError::Upstream(Self::error_body(response).await));
        }
        let body: CollectionsResponse = response.json().await.map_err(ApiError::upstream)?;
        Ok(body
            .result
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    async fn create_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), ApiError> {
        let url = format!("{}/collections/{}", self.base_url, name);
        let body = json!({
            "vectors": {
                "size": dimension,
                "distance": distance.as_str(),
            }
        });
        let response = self
            .request(self.http.put(url).json(&body))
            .send()
            .await
            .map_err(ApiError::upstream)?;
        match response.status() {
            // Conflict means another caller won the create race; the
            // collection exists either way.
            StatusCode::OK | StatusCode::CREATED | StatusCode::CONFLICT => Ok(()),
            _ => Err(ApiError::Upstream(Self::error_body(response).await)),
        }
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, ApiError> {
        let url = format!("{}/collections/{}", self.base_url, name);
        let response = self
            .request(self.http.delete(url))
            .send()
            .await
            .map_err(ApiError::upstream)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(ApiError::Upstream(Self::error_body(response).await));
        }
        let body: DeleteResponse = response.json().await.map_err(ApiError::upstream)?;
        Ok(body.result)
    }

    async fn upsert(&self, collection: &str, points: Vec<IndexPoint>) -> Result<(), ApiError> {
        if points.is_empty() {
            return Ok(());
        }
        let url = format!("{}/collections/{}/points", self.base_url, collection);
        let payload: Vec<serde_json::Value> = points
            .into_iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "vector": p.vector,
                    "payload": { "text": p.text, "source": p.source },
                })
            })
            .collect();
        let response = self
            .request(
                self.http
                    .post(url)
                    .query(&[("wait", "true")])
                    .json(&json!({ "points": payload })),
            )
            .send()
            .await
            .map_err(ApiError::upstream)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Upstream(Self::error_body(response).await))
        }
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, ApiError> {
        let url = format!("{}/collections/{}/points/search", self.base_url, collection);
        let body = json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
        });
        let response = self
            .request(self.http.post(url).json(&body))
            .send()
            .await
            .map_err(ApiError::upstream)?;
        if !response.status().is_success() {
            return Err(ApiError::Upstream(Self::error_body(response).await));
        }
        let body: SearchResponse = response.json().await.map_err(ApiError::upstream)?;

        let hits = body
            .result
            .into_iter()
            .filter_map(|entry| {
                let payload = entry.payload?;
                let text = payload.get("text")?.as_str()?.to_string();
                let source = payload
                    .get("source")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                Some(ScoredPoint {
                    text,
                    source,
                    score: entry.score,
                })
            })
            .collect();
        Ok(hits)
    }
}
