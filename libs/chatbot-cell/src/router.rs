use std::sync::Arc;

use axum::{Router, routing::post};

use shared_config::AppConfig;

use crate::handlers;

/// Public: the chat is available before sign-in.
pub fn chatbot_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/chatbot/chat/", post(handlers::chat))
        .route("/chatbot/check-crisis/", post(handlers::crisis_check))
        .with_state(state)
}
