//! Gemini REST clients for embeddings and chat completion.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, EmbeddingProvider, LanguageModel};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const EMBEDDING_MODEL: &str = "gemini-embedding-001";
const CHAT_MODEL: &str = "gemini-2.5-flash";

/// `gemini-embedding-001` over the batch embed endpoint.
pub struct GeminiEmbeddings {
    http: reqwest::Client,
    api_key: String,
    dimension: usize,
}

impl GeminiEmbeddings {
    pub fn new(api_key: String, dimension: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            dimension,
        }
    }
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{API_BASE}/models/{EMBEDDING_MODEL}:batchEmbedContents?key={}",
            self.api_key
        );
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{EMBEDDING_MODEL}"),
                    "content": { "parts": [{ "text": text }] },
                    "outputDimensionality": self.dimension,
                })
            })
            .collect();

        let response = self
            .http
            .post(url)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(ApiError::upstream)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "embedding request failed ({status}): {body}"
            )));
        }

        let body: BatchEmbedResponse = response.json().await.map_err(ApiError::upstream)?;
        if body.embeddings.len() != texts.len() {
            return Err(ApiError::Upstream(format!(
                "embedding count mismatch: sent {} texts, got {} vectors",
                texts.len(),
                body.embeddings.len()
            )));
        }
        Ok(body.embeddings.into_iter().map(|e| e.values).collect())
    }
}

/// `gemini-2.5-flash` over the generateContent endpoint.
pub struct GeminiChat {
    http: reqwest::Client,
    api_key: String,
}

impl GeminiChat {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

#[async_trait]
impl LanguageModel for GeminiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ApiError> {
        let url = format!(
            "{API_BASE}/models/{CHAT_MODEL}:generateContent?key={}",
            self.api_key
        );

        // Gemini carries the system prompt out of band and knows only
        // user/model roles.
        let system_text: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();
        let contents: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": { "temperature": 0.2 },
        });
        if !system_text.is_empty() {
            body["systemInstruction"] = json!({
                "parts": [{ "text": system_text.join("\n") }]
            });
        }

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "chat completion failed ({status}): {text}"
            )));
        }

        let body: GenerateResponse = response.json().await.map_err(ApiError::upstream)?;
        let answer = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| ApiError::Upstream("empty completion response".to_string()))?;
        Ok(answer)
    }
}
