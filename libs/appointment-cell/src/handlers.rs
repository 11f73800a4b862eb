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

use crate::models::{
    AppointmentListQuery, CancelAppointmentRequest, ConfirmAppointmentRequest,
    CreateAppointmentRequest, FeedbackRequest,
};
use crate::services::{
    AppointmentBookingService, AppointmentListingService, FeedbackService, Participant,
};

// ==============================================================================
// PATIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, Role::Patient)?;
    let booking_service = AppointmentBookingService::new(&state);

    let now = Utc::now();
    let appointment = booking_service
        .book_appointment(&user, request, now, auth.token())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment.into_view(now),
            "message": "Appointment booked successfully"
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AppointmentListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;
    let listing_service = AppointmentListingService::new(&state);

    let page = listing_service
        .list_appointments(&user, Participant::Patient, &query, Utc::now(), auth.token())
        .await?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn submit_feedback(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, Role::Patient)?;
    let feedback_service = FeedbackService::new(&state);

    let feedback = feedback_service
        .submit_feedback(&user, appointment_id, request, auth.token())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Feedback submitted successfully",
            "feedback": feedback
        })),
    ))
}

// ==============================================================================
// PARTICIPANT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service
        .get_for_participant(&user, appointment_id, auth.token())
        .await?;

    Ok(Json(json!(appointment.into_view(Utc::now()))))
}

#[axum::debug_handler]
pub async fn get_appointment_history(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);

    let history = booking_service
        .get_history(&user, appointment_id, auth.token())
        .await?;

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "history": history
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);

    let now = Utc::now();
    let appointment = booking_service
        .cancel_appointment(&user, appointment_id, request, now, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment.into_view(now),
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let participant = Participant::for_role(user.role).ok_or_else(|| {
        AppError::Forbidden("Only patients and therapists have appointment statistics".to_string())
    })?;
    let listing_service = AppointmentListingService::new(&state);

    let stats = listing_service
        .appointment_stats(&user, participant, Utc::now().date_naive(), auth.token())
        .await?;

    Ok(Json(json!(stats)))
}

// ==============================================================================
// THERAPIST HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_therapist_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AppointmentListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Therapist)?;
    let listing_service = AppointmentListingService::new(&state);

    let page = listing_service
        .list_appointments(&user, Participant::Therapist, &query, Utc::now(), auth.token())
        .await?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    request: Option<Json<ConfirmAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Therapist)?;
    let booking_service = AppointmentBookingService::new(&state);
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let now = Utc::now();
    let appointment = booking_service
        .confirm_appointment(&user, appointment_id, request, now, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment.into_view(now),
        "message": "Appointment confirmed"
    })))
}
