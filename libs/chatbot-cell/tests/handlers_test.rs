use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{extract::State, Json};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatbot_cell::handlers::{chat, crisis_check};
use chatbot_cell::models::{ChatRequest, CrisisCheckRequest};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::TestConfig;

fn config_for(server: &MockServer) -> Arc<AppConfig> {
    Arc::new(TestConfig::with_mock_server(&server.uri()))
}

fn chat_request(body: serde_json::Value) -> Json<ChatRequest> {
    Json(serde_json::from_value(body).unwrap())
}

#[tokio::test]
async fn chat_returns_generated_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"options": {"num_predict": 500}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "That sounds exhausting. What usually helps you unwind before bed?"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let Json(body) = chat(
        State(config_for(&server)),
        chat_request(json!({
            "message": "I keep waking up at 3am",
            "history": [
                {"role": "user", "content": "Hi"},
                {"role": "model", "content": "Hello, how are you feeling today?"}
            ]
        })),
    )
    .await
    .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(
        body["response"],
        "That sounds exhausting. What usually helps you unwind before bed?"
    );
}

#[tokio::test]
async fn chat_requires_a_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = chat(State(config_for(&server)), Json(ChatRequest::default()))
        .await
        .unwrap_err();

    assert_matches!(err, AppError::BadRequest(msg) if msg == "Message is required");
}

#[tokio::test]
async fn generator_failure_is_a_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = chat(
        State(config_for(&server)),
        chat_request(json!({"message": "hello"})),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::Internal(_));
}

#[tokio::test]
async fn crisis_check_reports_helpline() {
    let Json(body) = crisis_check(Json(CrisisCheckRequest {
        message: "I see no reason to live anymore".to_string(),
    }))
    .await;

    assert_eq!(
        body,
        json!({
            "is_crisis": true,
            "helpline": "100",
            "message": "Please reach out to a crisis helpline immediately."
        })
    );

    let Json(body) = crisis_check(Json(CrisisCheckRequest::default())).await;
    assert_eq!(body, json!({"is_crisis": false, "helpline": null, "message": null}));
}
