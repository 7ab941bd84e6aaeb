use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "started_at": state.started_at.to_rfc3339(),
        "features": {
            "async_upload": true,
            "job_tracking": true,
            "batched_processing": true,
            "per_user_isolation": true,
        },
        "endpoints": {
            "upload": "POST /upload",
            "status": "GET /upload/status/{job_id}",
            "chat": "POST /chat",
            "delete": "DELETE /collection",
        },
    }))
}
