//! HTTP surface tests: request validation and status codes, driven through
//! the real router with stub model and embedding implementations.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use tower::ServiceExt;

use scriba_backend::chat::ChatService;
use scriba_backend::core::config::{AppPaths, Settings};
use scriba_backend::core::errors::ApiError;
use scriba_backend::history::HistoryStore;
use scriba_backend::ingest::{IngestionOrchestrator, PlainTextExtractor};
use scriba_backend::jobs::JobTracker;
use scriba_backend::llm::{ChatMessage, EmbeddingProvider, LanguageModel};
use scriba_backend::rag::{ChunkerConfig, MemoryIndex, TextChunker, VectorStoreGateway};
use scriba_backend::server::router::router;
use scriba_backend::state::AppState;

struct FakeEmbeddings;

#[async_trait]
impl EmbeddingProvider for FakeEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

struct StubModel;

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ApiError> {
        Ok("stub answer".to_string())
    }
}

async fn test_app() -> (axum::Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let paths = Arc::new(AppPaths {
        data_dir: dir.path().to_path_buf(),
        log_dir: dir.path().join("logs"),
        db_path: dir.path().join("test.db"),
        staging_dir: dir.path().join("staging"),
    });
    let settings = Settings {
        qdrant_url: None,
        qdrant_api_key: None,
        gemini_api_key: None,
        chunk_size: 800,
        chunk_overlap: 100,
        upsert_batch_size: 100,
    };

    let gateway = Arc::new(VectorStoreGateway::new(
        Arc::new(FakeEmbeddings),
        Arc::new(MemoryIndex::new()),
        TextChunker::new(ChunkerConfig::new(800, 100).unwrap()),
        2,
    ));
    let jobs = JobTracker::new(paths.db_path.clone()).await.unwrap();
    let history = HistoryStore::new(paths.db_path.clone()).await.unwrap();
    let orchestrator = Arc::new(IngestionOrchestrator::new(
        gateway.clone(),
        jobs.clone(),
        Arc::new(PlainTextExtractor),
        100,
    ));
    let chat = Arc::new(ChatService::new(
        gateway.clone(),
        history,
        Arc::new(StubModel),
    ));

    let state = Arc::new(AppState {
        paths,
        settings,
        gateway,
        orchestrator,
        chat,
        jobs,
        started_at: Utc::now(),
    });
    (router(state), dir)
}

fn multipart_upload(user_id: &str, filename: &str, content: &str) -> Request<Body> {
    let boundary = "test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"user_id\"\r\n\r\n\
         {user_id}\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let (app, _dir) = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn upload_with_blank_user_id_is_rejected() {
    let (app, _dir) = test_app().await;
    let response = app
        .oneshot(multipart_upload("   ", "doc.txt", "some body"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_with_unsupported_extension_is_rejected() {
    let (app, _dir) = test_app().await;
    let response = app
        .oneshot(multipart_upload("u1", "picture.png", "not a document"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_accepts_and_queues() {
    let (app, _dir) = test_app().await;
    let response = app
        .oneshot(multipart_upload("u1", "doc.txt", "hello document"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_job_status_is_not_found() {
    let (app, _dir) = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/upload/status/no-such-job")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_with_blank_user_id_is_rejected() {
    let (app, _dir) = test_app().await;
    let response = app
        .oneshot(json_post("/chat", r#"{"user_id": " ", "query": "hello"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_with_blank_query_is_rejected() {
    let (app, _dir) = test_app().await;
    let response = app
        .oneshot(json_post("/chat", r#"{"user_id": "u1", "query": ""}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_answers_for_a_user_with_no_documents() {
    let (app, _dir) = test_app().await;
    let response = app
        .oneshot(json_post("/chat", r#"{"user_id": "u1", "query": "hi"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn delete_collection_for_unknown_user_is_ok() {
    let (app, _dir) = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/collection")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"user_id": "ghost"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
