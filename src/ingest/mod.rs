//! Background document ingestion.
//!
//! One detached task per accepted upload. The submitting request returns as
//! soon as the job record exists; from then on the job record is the only
//! channel back to the caller. Failures inside the task are written into
//! the record and never escape it.

pub mod extract;
pub mod staging;

use std::sync::Arc;

pub use extract::{PlainTextExtractor, TextExtractor};
pub use staging::StagedFile;

use crate::core::errors::ApiError;
use crate::jobs::{JobStatus, JobTracker, JobUpdate};
use crate::rag::gateway::{DocumentInput, VectorStoreGateway};
use crate::rag::registry::collection_name_for;

pub struct IngestionOrchestrator {
    gateway: Arc<VectorStoreGateway>,
    jobs: JobTracker,
    extractor: Arc<dyn TextExtractor>,
    batch_size: usize,
}

impl IngestionOrchestrator {
    pub fn new(
        gateway: Arc<VectorStoreGateway>,
        jobs: JobTracker,
        extractor: Arc<dyn TextExtractor>,
        batch_size: usize,
    ) -> Self {
        Self {
            gateway,
            jobs,
            extractor,
            batch_size,
        }
    }

    pub fn jobs(&self) -> &JobTracker {
        &self.jobs
    }

    /// Create the job record and detach the background run.
    ///
    /// Returns the generated job id once the record exists; the caller
    /// polls `JobTracker::get` for progress from then on.
    pub async fn submit(
        self: &Arc<Self>,
        user_id: &str,
        staged: StagedFile,
        filename: &str,
    ) -> Result<String, ApiError> {
        let job_id = uuid::Uuid::new_v4().to_string();
        self.jobs.create(&job_id, user_id, filename).await?;

        let orchestrator = self.clone();
        let job = job_id.clone();
        let user = user_id.to_string();
        let name = filename.to_string();
        tokio::spawn(async move {
            orchestrator.run(job, user, staged, name).await;
        });

        tracing::info!("upload job {job_id} queued for user {user_id}, file {filename}");
        Ok(job_id)
    }

    /// Background unit of work for one job.
    ///
    /// `staged` is owned here; whatever happens below, dropping it at the
    /// end of this function removes the temp file.
    async fn run(&self, job_id: String, user_id: String, staged: StagedFile, filename: String) {
        let outcome = self
            .process(&job_id, &user_id, &staged, &filename)
            .await;

        if let Err(err) = outcome {
            tracing::error!("job {job_id} failed: {err}");
            let failed = self
                .jobs
                .update(
                    &job_id,
                    JobStatus::Failed,
                    JobUpdate {
                        error_message: Some(err.to_string()),
                        ..JobUpdate::default()
                    },
                )
                .await;
            if let Err(update_err) = failed {
                tracing::error!("could not record failure for job {job_id}: {update_err}");
            }
        }
    }

    async fn process(
        &self,
        job_id: &str,
        user_id: &str,
        staged: &StagedFile,
        filename: &str,
    ) -> Result<(), ApiError> {
        tracing::info!("starting background processing for job {job_id}");
        self.jobs
            .update(job_id, JobStatus::Processing, JobUpdate::progress(10))
            .await?;

        let text = self.extractor.extract(staged.path()).await?;
        self.jobs
            .update(job_id, JobStatus::Processing, JobUpdate::progress(30))
            .await?;

        let document = DocumentInput {
            text,
            source: filename.to_string(),
        };
        let inserted = self
            .gateway
            .add_documents(user_id, &[document], self.batch_size)
            .await?;
        self.jobs
            .update(job_id, JobStatus::Processing, JobUpdate::progress(90))
            .await?;

        self.jobs
            .update(
                job_id,
                JobStatus::Completed,
                JobUpdate {
                    collection_name: Some(collection_name_for(user_id)),
                    inserted_chunks: Some(inserted as i64),
                    progress_percent: Some(100),
                    ..JobUpdate::default()
                },
            )
            .await?;

        tracing::info!("job {job_id} completed: {inserted} chunks inserted for user {user_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::jobs::IngestionJob;
    use crate::llm::EmbeddingProvider;
    use crate::rag::chunker::{ChunkerConfig, TextChunker};
    use crate::rag::memory::MemoryIndex;

    struct FakeEmbeddings;

    #[async_trait]
    impl EmbeddingProvider for FakeEmbeddings {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl TextExtractor for FailingExtractor {
        async fn extract(&self, _path: &Path) -> Result<String, ApiError> {
            Err(ApiError::Internal("corrupt document".to_string()))
        }
    }

    async fn orchestrator_with(extractor: Arc<dyn TextExtractor>) -> Arc<IngestionOrchestrator> {
        let gateway = Arc::new(VectorStoreGateway::new(
            Arc::new(FakeEmbeddings),
            Arc::new(MemoryIndex::new()),
            TextChunker::new(ChunkerConfig::new(800, 100).unwrap()),
            2,
        ));
        let db = std::env::temp_dir().join(format!("scriba-ingest-{}.db", uuid::Uuid::new_v4()));
        let jobs = JobTracker::new(db).await.unwrap();
        Arc::new(IngestionOrchestrator::new(gateway, jobs, extractor, 100))
    }

    async fn wait_for_terminal(orchestrator: &IngestionOrchestrator, job_id: &str) -> IngestionJob {
        for _ in 0..200 {
            let job = orchestrator.jobs.get(job_id).await.unwrap().unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} never reached a terminal state");
    }

    #[tokio::test]
    async fn successful_ingestion_completes_with_counts() {
        let orchestrator = orchestrator_with(Arc::new(PlainTextExtractor)).await;
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::create(dir.path(), "Alpha Beta Gamma. ".repeat(120).as_bytes())
            .await
            .unwrap();
        let staged_path = staged.path().to_path_buf();

        let job_id = orchestrator.submit("u1", staged, "alpha.pdf").await.unwrap();
        let job = wait_for_terminal(&orchestrator, &job_id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress_percent, 100);
        assert_eq!(job.collection_name.as_deref(), Some("user_u1_data"));
        assert!(job.inserted_chunks.unwrap() > 0);
        assert!(job.error_message.is_none());
        assert!(!staged_path.exists(), "staged file must be released");
    }

    #[tokio::test]
    async fn failed_extraction_marks_job_failed_and_cleans_up() {
        let orchestrator = orchestrator_with(Arc::new(FailingExtractor)).await;
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::create(dir.path(), b"whatever").await.unwrap();
        let staged_path = staged.path().to_path_buf();

        let job_id = orchestrator.submit("u1", staged, "bad.pdf").await.unwrap();
        let job = wait_for_terminal(&orchestrator, &job_id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job
            .error_message
            .as_deref()
            .unwrap()
            .contains("corrupt document"));
        assert!(job.collection_name.is_none());
        assert!(job.inserted_chunks.is_none());
        assert!(!staged_path.exists(), "staged file must be released on failure too");
    }

    #[tokio::test]
    async fn submission_returns_before_completion() {
        let orchestrator = orchestrator_with(Arc::new(PlainTextExtractor)).await;
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::create(dir.path(), b"tiny").await.unwrap();

        let job_id = orchestrator.submit("u1", staged, "tiny.pdf").await.unwrap();
        // The record exists immediately, whatever state the task is in.
        let job = orchestrator.jobs.get(&job_id).await.unwrap().unwrap();
        assert!(!matches!(job.status, JobStatus::Failed));

        let job = wait_for_terminal(&orchestrator, &job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
    }
}
