use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
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

use crate::models::{CreateAvailabilityRequest, CreateTimeOffRequest, TherapistListQuery};
use crate::services::{AvailabilityService, DirectoryService};

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_therapists(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<TherapistListQuery>,
) -> Result<Json<Value>, AppError> {
    let directory = DirectoryService::new(&state);

    let page = directory.list_therapists(&query, None).await?;

    Ok(Json(json!(page)))
}

// ==============================================================================
// AUTHENTICATED READS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_therapist_availability(
    State(state): State<Arc<AppConfig>>,
    Path(therapist_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let weekly = availability_service
        .get_weekly_availability(therapist_id, auth.token())
        .await?;

    Ok(Json(json!(weekly)))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Path(therapist_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let slots = availability_service
        .get_available_slots(therapist_id, Utc::now(), auth.token())
        .await?;

    Ok(Json(json!(slots)))
}

// ==============================================================================
// THERAPIST SELF-SERVICE
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Therapist)?;
    let availability_service = AvailabilityService::new(&state);

    let weekly = availability_service
        .get_weekly_availability(user.id, auth.token())
        .await?;

    Ok(Json(json!(weekly)))
}

#[axum::debug_handler]
pub async fn create_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Therapist)?;
    let availability_service = AvailabilityService::new(&state);

    let rule = availability_service
        .create_availability(&user, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "availability": rule,
        "message": "Availability added"
    })))
}

#[axum::debug_handler]
pub async fn list_time_off(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Therapist)?;
    let availability_service = AvailabilityService::new(&state);

    let periods = availability_service.list_time_off(user.id, auth.token()).await?;

    Ok(Json(json!({
        "time_off": periods,
        "total": periods.len()
    })))
}

#[axum::debug_handler]
pub async fn create_time_off(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateTimeOffRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Therapist)?;
    let availability_service = AvailabilityService::new(&state);

    let period = availability_service
        .create_time_off(&user, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "time_off": period,
        "message": "Time off recorded"
    })))
}

#[axum::debug_handler]
pub async fn delete_time_off(
    State(state): State<Arc<AppConfig>>,
    Path(time_off_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Therapist)?;
    let availability_service = AvailabilityService::new(&state);

    availability_service
        .delete_time_off(&user, time_off_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Time off removed"
    })))
}
