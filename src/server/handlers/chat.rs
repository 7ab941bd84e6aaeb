use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::config::DEFAULT_TOP_K;
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub query: String,
    pub top_k: Option<usize>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    if payload.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query is required".to_string()));
    }

    let top_k = payload.top_k.unwrap_or(DEFAULT_TOP_K);
    let result = state.chat.ask(user_id, &payload.query, top_k).await?;
    Ok(Json(result))
}
