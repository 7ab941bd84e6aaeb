use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::chat::ChatService;
use crate::core::config::{AppPaths, Settings, EMBEDDING_DIMENSION};
use crate::history::HistoryStore;
use crate::ingest::{IngestionOrchestrator, PlainTextExtractor};
use crate::jobs::JobTracker;
use crate::llm::gemini::{GeminiChat, GeminiEmbeddings};
use crate::rag::chunker::{ChunkerConfig, TextChunker};
use crate::rag::index::VectorIndex;
use crate::rag::memory::MemoryIndex;
use crate::rag::qdrant::QdrantIndex;
use crate::rag::VectorStoreGateway;

#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub gateway: Arc<VectorStoreGateway>,
    pub orchestrator: Arc<IngestionOrchestrator>,
    pub chat: Arc<ChatService>,
    pub jobs: JobTracker,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::from_env()?;

        let api_key = settings.gemini_api_key.clone().ok_or_else(|| {
            anyhow::anyhow!("GEMINI_API_KEY is required for embeddings and chat")
        })?;

        let index: Arc<dyn VectorIndex> = match &settings.qdrant_url {
            Some(url) => {
                tracing::info!("using qdrant vector index at {url}");
                Arc::new(QdrantIndex::new(url, settings.qdrant_api_key.clone())?)
            }
            None => {
                tracing::warn!("QDRANT_URL not set, falling back to in-process vector index");
                Arc::new(MemoryIndex::new())
            }
        };

        let chunker = TextChunker::new(ChunkerConfig::new(
            settings.chunk_size,
            settings.chunk_overlap,
        )?);
        let embeddings = Arc::new(GeminiEmbeddings::new(api_key.clone(), EMBEDDING_DIMENSION));
        let gateway = Arc::new(VectorStoreGateway::new(embeddings, index, chunker, EMBEDDING_DIMENSION));

        let jobs = JobTracker::new(paths.db_path.clone()).await?;
        let history = HistoryStore::new(paths.db_path.clone()).await?;

        let orchestrator = Arc::new(IngestionOrchestrator::new(
            gateway.clone(),
            jobs.clone(),
            Arc::new(PlainTextExtractor),
            settings.upsert_batch_size,
        ));
        let chat = Arc::new(ChatService::new(
            gateway.clone(),
            history,
            Arc::new(GeminiChat::new(api_key)),
        ));

        Ok(Arc::new(AppState {
            paths,
            settings,
            gateway,
            orchestrator,
            chat,
            jobs,
            started_at: Utc::now(),
        }))
    }
}
