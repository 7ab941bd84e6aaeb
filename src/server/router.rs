use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, collection, health, upload};
use crate::state::AppState;

/// Build the application router.
///
/// Routes mirror the service surface: async upload + job polling, chat,
/// and collection deletion, with CORS and request tracing layered on.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health::health))
        .route("/upload", post(upload::upload))
        .route("/upload/status/:job_id", get(upload::upload_status))
        .route("/chat", post(chat::chat))
        .route("/collection", delete(collection::delete_collection))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
