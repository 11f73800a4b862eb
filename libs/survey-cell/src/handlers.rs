use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
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
    DynamicAnswerRequest, DynamicQuestionOutcome, StaticResponsesRequest, SurveyIdRequest,
};
use crate::services::SurveyService;

// ==============================================================================
// SURVEY LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn start_survey(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, Role::Patient)?;
    let survey_service = SurveyService::new(&state);

    let (survey, created) = survey_service.start_survey(&user, auth.token()).await?;

    let (status, message) = if created {
        (StatusCode::CREATED, "Survey started successfully")
    } else {
        (StatusCode::OK, "You already have an incomplete survey")
    };

    Ok((
        status,
        Json(json!({
            "survey_id": survey.id,
            "survey": survey,
            "message": message
        })),
    ))
}

#[axum::debug_handler]
pub async fn complete_survey(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SurveyIdRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;
    let survey_service = SurveyService::new(&state);

    let (survey, analysis) = survey_service
        .complete_survey(&user, request.survey_id, Utc::now(), auth.token())
        .await?;

    Ok(Json(json!({
        "message": "Survey completed successfully",
        "survey_id": survey.id,
        "summary": analysis.summary,
        "risk_level": analysis.risk_level
    })))
}

#[axum::debug_handler]
pub async fn survey_history(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;
    let survey_service = SurveyService::new(&state);

    let surveys = survey_service.survey_history(&user, auth.token()).await?;

    Ok(Json(json!({
        "surveys": surveys,
        "total": surveys.len()
    })))
}

#[axum::debug_handler]
pub async fn survey_detail(
    State(state): State<Arc<AppConfig>>,
    Path(survey_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;
    let survey_service = SurveyService::new(&state);

    let detail = survey_service
        .survey_detail(&user, survey_id, auth.token())
        .await?;

    Ok(Json(json!(detail)))
}

// ==============================================================================
// STATIC QUESTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_static_questions(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;
    let survey_service = SurveyService::new(&state);

    let questions = survey_service.static_questions(auth.token()).await?;

    Ok(Json(json!({
        "questions": questions,
        "total": questions.len()
    })))
}

#[axum::debug_handler]
pub async fn submit_static_responses(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<StaticResponsesRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, Role::Patient)?;
    let survey_service = SurveyService::new(&state);

    let saved = survey_service
        .submit_static_responses(&user, request, auth.token())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Responses saved successfully",
            "saved_count": saved.len(),
            "responses": saved
        })),
    ))
}

// ==============================================================================
// DYNAMIC QUESTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_dynamic_question(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SurveyIdRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Patient)?;
    let survey_service = SurveyService::new(&state);

    let outcome = survey_service
        .next_dynamic_question(&user, request.survey_id, auth.token())
        .await?;

    let body = match outcome {
        DynamicQuestionOutcome::Question { question_text, question_number } => json!({
            "question_text": question_text,
            "question_number": question_number,
            "is_final": question_number >= state.max_dynamic_questions
        }),
        DynamicQuestionOutcome::LimitReached => json!({
            "message": "Maximum dynamic questions reached",
            "is_final": true
        }),
        DynamicQuestionOutcome::Unavailable => json!({
            "error": "Unable to generate dynamic question. Please try again.",
            "is_final": true
        }),
    };

    Ok(Json(body))
}

#[axum::debug_handler]
pub async fn submit_dynamic_answer(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<DynamicAnswerRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, Role::Patient)?;
    let survey_service = SurveyService::new(&state);

    let entry = survey_service
        .submit_dynamic_answer(&user, request, auth.token())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Answer saved successfully",
            "response_id": entry.id,
            "dynamic_question": entry
        })),
    ))
}
