//! Ingestion job tracking.
//!
//! Persists one record per upload and walks it through
//! queued -> processing -> completed/failed. Terminal states are final: the
//! update statement refuses to touch a completed or failed job, so polling
//! can never observe a job leaving a terminal state.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw {
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Queued,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionJob {
    pub job_id: String,
    pub user_id: String,
    pub filename: String,
    pub status: JobStatus,
    pub progress_percent: i64,
    pub collection_name: Option<String>,
    pub inserted_chunks: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional fields of a partial job update. Only supplied fields are
/// written; status and `updated_at` are always written.
#[derive(Debug, Default, Clone)]
pub struct JobUpdate {
    pub collection_name: Option<String>,
    pub inserted_chunks: Option<i64>,
    pub error_message: Option<String>,
    pub progress_percent: Option<i64>,
}

impl JobUpdate {
    pub fn progress(percent: i64) -> Self {
        Self {
            progress_percent: Some(percent),
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct JobTracker {
    pool: SqlitePool,
}

impl JobTracker {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let tracker = Self { pool };
        tracker.init_schema().await?;
        Ok(tracker)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS ingestion_jobs (
                job_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                filename TEXT NOT NULL,
                status TEXT NOT NULL,
                progress_percent INTEGER NOT NULL DEFAULT 0,
                collection_name TEXT,
                inserted_chunks INTEGER,
                error_message TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_user ON ingestion_jobs(user_id)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    /// Insert a new job in `queued` state. The id must be fresh; a
    /// duplicate violates the primary key and surfaces as an error.
    pub async fn create(
        &self,
        job_id: &str,
        user_id: &str,
        filename: &str,
    ) -> Result<IngestionJob, ApiError> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO ingestion_jobs
                (job_id, user_id, filename, status, progress_percent, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
        )
        .bind(job_id)
        .bind(user_id)
        .bind(filename)
        .bind(JobStatus::Queued.as_str())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(IngestionJob {
            job_id: job_id.to_string(),
            user_id: user_id.to_string(),
            filename: filename.to_string(),
            status: JobStatus::Queued,
            progress_percent: 0,
            collection_name: None,
            inserted_chunks: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Partial update. Ignored with a warning when the job already reached
    /// a terminal state; `NotFound` when the job does not exist.
    pub async fn update(
        &self,
        job_id: &str,
        status: JobStatus,
        fields: JobUpdate,
    ) -> Result<(), ApiError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE ingestion_jobs SET
                status = ?2,
                updated_at = ?3,
                collection_name = COALESCE(?4, collection_name),
                inserted_chunks = COALESCE(?5, inserted_chunks),
                error_message = COALESCE(?6, error_message),
                progress_percent = COALESCE(?7, progress_percent)
             WHERE job_id = ?1 AND status NOT IN ('completed', 'failed')",
        )
        .bind(job_id)
        .bind(status.as_str())
        .bind(&now)
        .bind(fields.collection_name)
        .bind(fields.inserted_chunks)
        .bind(fields.error_message)
        .bind(fields.progress_percent)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        if result.rows_affected() == 0 {
            if self.get(job_id).await?.is_none() {
                return Err(ApiError::NotFound(format!("job {job_id} not found")));
            }
            tracing::warn!("ignoring update to terminal job {job_id}");
        }
        Ok(())
    }

    pub async fn get(&self, job_id: &str) -> Result<Option<IngestionJob>, ApiError> {
        let row = sqlx::query("SELECT * FROM ingestion_jobs WHERE job_id = ?1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        let status: String = row.get("status");

        Ok(Some(IngestionJob {
            job_id: row.get("job_id"),
            user_id: row.get("user_id"),
            filename: row.get("filename"),
            status: JobStatus::parse(&status),
            progress_percent: row.get("progress_percent"),
            collection_name: row.get("collection_name"),
            inserted_chunks: row.get("inserted_chunks"),
            error_message: row.get("error_message"),
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        }))
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
