use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeleteCollectionRequest {
    pub user_id: String,
}

/// Remove a user's entire vector collection.
pub async fn delete_collection(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DeleteCollectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }

    let deleted = state.gateway.delete_user_data(user_id).await?;
    let message = if deleted {
        "Collection deleted successfully."
    } else {
        "No collection found for this user."
    };
    Ok(Json(json!({
        "user_id": user_id,
        "deleted": deleted,
        "message": message,
    })))
}
