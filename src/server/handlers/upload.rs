use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::errors::ApiError;
use crate::ingest::StagedFile;
use crate::jobs::IngestionJob;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadJobResponse {
    pub job_id: String,
    pub user_id: String,
    pub status: &'static str,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Accept a document upload and queue it for background ingestion.
///
/// Validation happens here, before any job record exists; the response
/// carries the job id to poll.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut user_id: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("user_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                user_id = Some(value);
            }
            Some("file") => {
                filename = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                content = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    let user_id = user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("user_id is required".to_string()))?;
    let filename =
        filename.ok_or_else(|| ApiError::BadRequest("file field is required".to_string()))?;
    let content = content.ok_or_else(|| ApiError::BadRequest("file is empty".to_string()))?;

    let lower = filename.to_lowercase();
    if !lower.ends_with(".pdf") && !lower.ends_with(".txt") {
        return Err(ApiError::BadRequest(
            "only PDF and plain-text documents are supported".to_string(),
        ));
    }

    let staged = StagedFile::create(&state.paths.staging_dir, &content).await?;
    let job_id = state
        .orchestrator
        .submit(&user_id, staged, &filename)
        .await?;

    Ok(Json(UploadJobResponse {
        message: format!(
            "Upload queued successfully. Use GET /upload/status/{job_id} to check progress."
        ),
        job_id,
        user_id,
        status: "queued",
        created_at: Utc::now(),
    }))
}

pub async fn upload_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<IngestionJob>, ApiError> {
    let job = state
        .jobs
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("job {job_id} not found")))?;
    Ok(Json(job))
}
