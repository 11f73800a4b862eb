use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{ChatRequest, CrisisCheckRequest};
use crate::services::{check_crisis, ChatService};

#[axum::debug_handler]
pub async fn chat(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    let chat_service = ChatService::new(&state);

    let response = chat_service.reply(&request.message, &request.history).await?;

    Ok(Json(json!({
        "response": response,
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn crisis_check(
    Json(request): Json<CrisisCheckRequest>,
) -> Json<Value> {
    Json(json!(check_crisis(&request.message)))
}
