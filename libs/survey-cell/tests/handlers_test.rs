use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};
use survey_cell::handlers::*;
use survey_cell::models::*;

fn create_auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer(token).unwrap())
}

struct Fixture {
    server: MockServer,
    config: Arc<AppConfig>,
    user: User,
    token: String,
}

async fn fixture_with(role: Role, max_dynamic_questions: usize) -> Fixture {
    let server = MockServer::start().await;
    let mut config = TestConfig::with_mock_server(&server.uri());
    config.max_dynamic_questions = max_dynamic_questions;
    let test_user = TestUser::new("meera@example.com", role);
    let token = JwtTestUtils::create_test_token(&test_user, &config.supabase_jwt_secret, Some(1));
    Fixture {
        server,
        config: Arc::new(config),
        user: test_user.to_user(),
        token,
    }
}

async fn fixture() -> Fixture {
    fixture_with(Role::Patient, 5).await
}

async fn mount_owned_survey(f: &Fixture, survey_id: Uuid, status: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/surveys"))
        .and(query_param("id", format!("eq.{}", survey_id)))
        .and(query_param("patient_id", format!("eq.{}", f.user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::survey(survey_id, f.user.id, status)
        ])))
        .mount(&f.server)
        .await;
}

async fn mount_rows(server: &MockServer, table: &str, rows: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/rest/v1/{}", table)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

fn static_question(order: i32, text: &str, response_type: &str, options: Option<Value>) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "question_text": text,
        "question_type": "static",
        "response_type": response_type,
        "display_order": order,
        "options": options
    })
}

fn stored_response(text: &str, order: i32, answer: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "question_id": Uuid::new_v4(),
        "answer": answer,
        "created_at": "2024-01-01T00:00:00Z",
        "question": {
            "question_text": text,
            "question_type": "static",
            "display_order": order
        }
    })
}

fn dynamic_entry(survey_id: Uuid, question: &str, answer: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "survey_id": survey_id,
        "question_text": question,
        "answer": answer,
        "created_at": "2024-01-01T00:05:00Z"
    })
}

async fn mount_llm(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(template)
        .mount(server)
        .await;
}

fn id_request(survey_id: Uuid) -> Json<SurveyIdRequest> {
    Json(SurveyIdRequest { survey_id: Some(survey_id) })
}

// ==============================================================================
// START
// ==============================================================================

#[tokio::test]
async fn start_creates_survey_when_none_in_progress() {
    let f = fixture().await;
    let survey_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/surveys"))
        .and(query_param("status", "eq.in_progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&f.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/surveys"))
        .and(body_partial_json(json!({"patient_id": f.user.id, "status": "in_progress"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::survey(survey_id, f.user.id, "in_progress")
        ])))
        .expect(1)
        .mount(&f.server)
        .await;

    let (status, Json(body)) = start_survey(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["survey_id"], json!(survey_id));
    assert_eq!(body["message"], "Survey started successfully");
}

#[tokio::test]
async fn start_returns_existing_in_progress_survey() {
    let f = fixture().await;
    let survey_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/surveys"))
        .and(query_param("status", "eq.in_progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::survey(survey_id, f.user.id, "in_progress")
        ])))
        .mount(&f.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/surveys"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&f.server)
        .await;

    let (status, Json(body)) = start_survey(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["survey_id"], json!(survey_id));
    assert_eq!(body["message"], "You already have an incomplete survey");
}

#[tokio::test]
async fn therapists_cannot_take_surveys() {
    let f = fixture_with(Role::Therapist, 5).await;

    let err = start_survey(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::Forbidden(_));
}

// ==============================================================================
// STATIC RESPONSES
// ==============================================================================

#[tokio::test]
async fn invalid_static_answer_saves_nothing() {
    let f = fixture().await;
    let survey_id = Uuid::new_v4();
    let mood = static_question(1, "How have you been feeling?", "single_choice", Some(json!(["Good", "Low"])));
    let coping = static_question(8, "What has been helping you cope?", "text", None);
    mount_owned_survey(&f, survey_id, "in_progress").await;
    mount_rows(&f.server, "survey_questions", json!([mood.clone(), coping.clone()])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/survey_responses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&f.server)
        .await;

    let request: StaticResponsesRequest = serde_json::from_value(json!({
        "survey_id": survey_id,
        "responses": [
            {"question_id": mood["id"], "answer": "Ecstatic"},
            {"question_id": coping["id"], "answer": "Long walks"}
        ]
    }))
    .unwrap();

    let err = submit_static_responses(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
        Json(request),
    )
    .await
    .unwrap_err();

    let key = mood["id"].as_str().unwrap().to_string();
    assert_matches!(err, AppError::FieldErrors(fields) if fields.len() == 1
        && fields[&key] == "Answer must be one of the listed options");
}

#[tokio::test]
async fn valid_static_answers_are_upserted_in_one_request() {
    let f = fixture().await;
    let survey_id = Uuid::new_v4();
    let mood = static_question(1, "How have you been feeling?", "single_choice", Some(json!(["Good", "Low"])));
    let coping = static_question(8, "What has been helping you cope?", "text", None);
    mount_owned_survey(&f, survey_id, "in_progress").await;
    mount_rows(&f.server, "survey_questions", json!([mood.clone(), coping.clone()])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/survey_responses"))
        .and(query_param("on_conflict", "survey_id,question_id"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&f.server)
        .await;

    let request: StaticResponsesRequest = serde_json::from_value(json!({
        "survey_id": survey_id,
        "responses": [
            {"question_id": coping["id"], "answer": " Long walks "},
            {"question_id": mood["id"], "answer": "Low"}
        ]
    }))
    .unwrap();

    let (status, Json(body)) = submit_static_responses(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
        Json(request),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["saved_count"], 2);
    assert_eq!(body["responses"][0]["answer"], "Low");
    assert_eq!(body["responses"][1]["answer"], "Long walks");
}

#[tokio::test]
async fn static_answers_require_survey_id() {
    let f = fixture().await;

    let err = submit_static_responses(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
        Json(StaticResponsesRequest::default()),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::BadRequest(msg) if msg == "survey_id is required");
}

// ==============================================================================
// DYNAMIC QUESTIONS
// ==============================================================================

#[tokio::test]
async fn dynamic_question_is_generated_from_answers() {
    let f = fixture().await;
    let survey_id = Uuid::new_v4();
    mount_owned_survey(&f, survey_id, "in_progress").await;
    mount_rows(
        &f.server,
        "survey_responses",
        json!([stored_response("How is your sleep?", 2, "Poor")]),
    )
    .await;
    mount_rows(&f.server, "dynamic_question_history", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "\"What keeps you awake at night\""
        })))
        .expect(1)
        .mount(&f.server)
        .await;

    let Json(body) = get_dynamic_question(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
        id_request(survey_id),
    )
    .await
    .unwrap();

    assert_eq!(body["question_text"], "What keeps you awake at night?");
    assert_eq!(body["question_number"], 1);
    assert_eq!(body["is_final"], false);
}

#[tokio::test]
async fn dynamic_question_stops_at_limit() {
    let f = fixture_with(Role::Patient, 2).await;
    let survey_id = Uuid::new_v4();
    mount_owned_survey(&f, survey_id, "in_progress").await;
    mount_rows(&f.server, "survey_responses", json!([])).await;
    mount_rows(
        &f.server,
        "dynamic_question_history",
        json!([
            dynamic_entry(survey_id, "What worries you most?", "Exams"),
            dynamic_entry(survey_id, "Who do you talk to?", "My sister")
        ]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&f.server)
        .await;

    let Json(body) = get_dynamic_question(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
        id_request(survey_id),
    )
    .await
    .unwrap();

    assert_eq!(body["message"], "Maximum dynamic questions reached");
    assert_eq!(body["is_final"], true);
}

#[tokio::test]
async fn generator_failure_degrades_to_final() {
    let f = fixture().await;
    let survey_id = Uuid::new_v4();
    mount_owned_survey(&f, survey_id, "in_progress").await;
    mount_rows(&f.server, "survey_responses", json!([])).await;
    mount_rows(&f.server, "dynamic_question_history", json!([])).await;
    mount_llm(&f.server, ResponseTemplate::new(503).set_body_string("model loading")).await;

    let Json(body) = get_dynamic_question(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
        id_request(survey_id),
    )
    .await
    .unwrap();

    assert_eq!(body["error"], "Unable to generate dynamic question. Please try again.");
    assert_eq!(body["is_final"], true);
}

#[tokio::test]
async fn dynamic_answer_requires_text() {
    let f = fixture().await;

    let err = submit_dynamic_answer(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
        Json(DynamicAnswerRequest {
            survey_id: Some(Uuid::new_v4()),
            question_text: "What worries you most?".to_string(),
            answer: "   ".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::FieldErrors(fields) if fields["answer"] == "Answer cannot be empty");
}

#[tokio::test]
async fn dynamic_answer_is_stored_with_context() {
    let f = fixture().await;
    let survey_id = Uuid::new_v4();
    mount_owned_survey(&f, survey_id, "in_progress").await;
    mount_rows(
        &f.server,
        "survey_responses",
        json!([stored_response("How is your sleep?", 2, "Poor")]),
    )
    .await;
    mount_rows(&f.server, "dynamic_question_history", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/dynamic_question_history"))
        .and(body_partial_json(json!({
            "survey_id": survey_id,
            "question_text": "What worries you most?",
            "answer": "Exams"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            dynamic_entry(survey_id, "What worries you most?", "Exams")
        ])))
        .expect(1)
        .mount(&f.server)
        .await;

    let (status, Json(body)) = submit_dynamic_answer(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
        Json(DynamicAnswerRequest {
            survey_id: Some(survey_id),
            question_text: "What worries you most?".to_string(),
            answer: " Exams ".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["dynamic_question"]["answer"], "Exams");
    assert!(body["dynamic_question"].get("context_used").is_none());
}

// ==============================================================================
// COMPLETION
// ==============================================================================

async fn mount_completion(f: &Fixture, survey_id: Uuid, risk: &str) {
    let mut completed = MockSupabaseResponses::survey(survey_id, f.user.id, "completed");
    completed["risk_level"] = json!(risk);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/surveys"))
        .and(query_param("status", "eq.in_progress"))
        .and(body_partial_json(json!({"status": "completed", "risk_level": risk})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([completed])))
        .expect(1)
        .mount(&f.server)
        .await;
}

#[tokio::test]
async fn completion_stores_parsed_summary() {
    let f = fixture().await;
    let survey_id = Uuid::new_v4();
    mount_owned_survey(&f, survey_id, "in_progress").await;
    mount_rows(
        &f.server,
        "survey_responses",
        json!([stored_response("How have you been feeling?", 1, "Low")]),
    )
    .await;
    mount_rows(
        &f.server,
        "dynamic_question_history",
        json!([dynamic_entry(survey_id, "Any thoughts of self-harm?", "Sometimes")]),
    )
    .await;
    mount_llm(
        &f.server,
        ResponseTemplate::new(200).set_body_json(json!({
            "response": "SUMMARY: Persistent low mood with intermittent self-harm thoughts.\nRISK: high"
        })),
    )
    .await;
    mount_completion(&f, survey_id, "high").await;

    let Json(body) = complete_survey(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
        id_request(survey_id),
    )
    .await
    .unwrap();

    assert_eq!(body["risk_level"], "high");
    assert_eq!(body["summary"], "Persistent low mood with intermittent self-harm thoughts.");
}

#[tokio::test]
async fn completion_survives_generator_failure() {
    let f = fixture().await;
    let survey_id = Uuid::new_v4();
    mount_owned_survey(&f, survey_id, "in_progress").await;
    mount_rows(&f.server, "survey_responses", json!([])).await;
    mount_rows(&f.server, "dynamic_question_history", json!([])).await;
    mount_llm(&f.server, ResponseTemplate::new(500)).await;
    mount_completion(&f, survey_id, "medium").await;

    let Json(body) = complete_survey(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
        id_request(survey_id),
    )
    .await
    .unwrap();

    assert_eq!(body["risk_level"], "medium");
    assert_eq!(body["summary"], "Error generating summary");
}

#[tokio::test]
async fn completed_survey_is_not_summarized_again() {
    let f = fixture().await;
    let survey_id = Uuid::new_v4();
    mount_owned_survey(&f, survey_id, "completed").await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&f.server)
        .await;

    let err = complete_survey(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
        id_request(survey_id),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::BadRequest(msg) if msg == "Survey is already completed");
}

#[tokio::test]
async fn foreign_survey_is_not_found() {
    let f = fixture().await;
    mount_rows(&f.server, "surveys", json!([])).await;

    let err = complete_survey(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
        id_request(Uuid::new_v4()),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::NotFound(_));
}

// ==============================================================================
// HISTORY
// ==============================================================================

#[tokio::test]
async fn history_counts_responses_per_survey() {
    let f = fixture().await;
    let mut answered = MockSupabaseResponses::survey(Uuid::new_v4(), f.user.id, "completed");
    answered["responses"] = json!([{"count": 10}]);
    let mut fresh = MockSupabaseResponses::survey(Uuid::new_v4(), f.user.id, "in_progress");
    fresh["responses"] = json!([]);
    mount_rows(&f.server, "surveys", json!([fresh, answered])).await;

    let Json(body) = survey_history(
        State(f.config.clone()),
        create_auth_header(&f.token),
        Extension(f.user.clone()),
    )
    .await
    .unwrap();

    assert_eq!(body["total"], 2);
    assert_eq!(body["surveys"][0]["total_responses"], 0);
    assert_eq!(body["surveys"][1]["total_responses"], 10);
    assert_eq!(body["surveys"][1]["status"], "completed");
}
