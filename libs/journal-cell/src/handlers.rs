use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{AnalyticsQuery, CreateEntryRequest, EntryListQuery, UpdateEntryRequest};
use crate::services::{mood_distribution, mood_trend, summarize, JournalService};

// ==============================================================================
// ENTRIES
// ==============================================================================

#[axum::debug_handler]
pub async fn list_entries(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<EntryListQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;
    let journal = JournalService::new(&state);

    let page = journal.list_entries(user.id, &query, auth.token()).await?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn create_entry(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, Role::Patient)?;
    let journal = JournalService::new(&state);

    let entry = journal.create_entry(user.id, request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(entry))))
}

#[axum::debug_handler]
pub async fn get_entry(
    State(state): State<Arc<AppConfig>>,
    Path(entry_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;
    let journal = JournalService::new(&state);

    let entry = journal.get_entry(user.id, entry_id, auth.token()).await?;

    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn update_entry(
    State(state): State<Arc<AppConfig>>,
    Path(entry_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateEntryRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;
    let journal = JournalService::new(&state);

    let entry = journal.update_entry(user.id, entry_id, request, auth.token()).await?;

    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn delete_entry(
    State(state): State<Arc<AppConfig>>,
    Path(entry_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    require_role(&user, Role::Patient)?;
    let journal = JournalService::new(&state);

    journal.delete_entry(user.id, entry_id, auth.token()).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// ANALYTICS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_mood_distribution(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;
    let days = query.days()?;
    let journal = JournalService::new(&state);

    let samples = journal.recent_samples(user.id, days, Utc::now(), auth.token()).await?;

    Ok(Json(json!(mood_distribution(&samples))))
}

#[axum::debug_handler]
pub async fn get_mood_trend(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;
    let days = query.days()?;
    let journal = JournalService::new(&state);

    let samples = journal.recent_samples(user.id, days, Utc::now(), auth.token()).await?;

    Ok(Json(json!(mood_trend(&samples))))
}

#[axum::debug_handler]
pub async fn get_summary(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;
    let journal = JournalService::new(&state);

    let samples = journal.mood_samples(user.id, None, auth.token()).await?;

    Ok(Json(json!(summarize(&samples, Utc::now()))))
}
