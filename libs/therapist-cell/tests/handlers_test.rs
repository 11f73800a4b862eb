use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};
use therapist_cell::handlers::*;
use therapist_cell::models::*;

fn create_auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer(token).unwrap())
}

fn every_day(range: &str) -> Value {
    json!({
        "Monday": [range], "Tuesday": [range], "Wednesday": [range], "Thursday": [range],
        "Friday": [range], "Saturday": [range], "Sunday": [range]
    })
}

async fn mount_therapist(server: &MockServer, therapist_id: Uuid, profile: Option<Value>) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", therapist_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_row(therapist_id, "asha@example.com", "Dr. Asha Rao", Role::Therapist)
        ])))
        .mount(server)
        .await;

    let profiles = profile.map(|p| vec![p]).unwrap_or_default();
    Mock::given(method("GET"))
        .and(path("/rest/v1/therapist_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(profiles)))
        .mount(server)
        .await;
}

async fn mount_empty(server: &MockServer, table: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/rest/v1/{}", table)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

fn setup(server: &MockServer, role: Role) -> (Arc<shared_config::AppConfig>, TestUser, String) {
    let config = TestConfig::with_mock_server(&server.uri());
    let user = TestUser::new("someone@example.com", role);
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));
    (Arc::new(config), user, token)
}

#[tokio::test]
async fn slots_mark_booked_intervals_unavailable() {
    let server = MockServer::start().await;
    let (config, _patient, token) = setup(&server, Role::Patient);
    let therapist_id = Uuid::new_v4();
    let tomorrow = Utc::now().date_naive() + Duration::days(1);

    mount_therapist(
        &server,
        therapist_id,
        Some(MockSupabaseResponses::therapist_profile(therapist_id, every_day("09:00 - 12:00"))),
    )
    .await;
    mount_empty(&server, "therapist_availability").await;
    mount_empty(&server, "time_off_periods").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/therapist_busy_intervals"))
        .and(query_param("therapist_id", format!("eq.{}", therapist_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "appointment_date": tomorrow,
            "start_time": "10:30:00",
            "end_time": "11:30:00",
            "status": "confirmed"
        }])))
        .mount(&server)
        .await;

    let response = get_available_slots(State(config), Path(therapist_id), create_auth_header(&token))
        .await
        .unwrap()
        .0;

    assert_eq!(response["therapist_name"], "Dr. Asha Rao");
    let slots = response["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 31 * 3);

    let tomorrow_str = tomorrow.to_string();
    let tomorrow_slots: Vec<&Value> = slots.iter().filter(|s| s["date"] == tomorrow_str.as_str()).collect();
    assert_eq!(
        tomorrow_slots.iter().map(|s| s["start_time"].as_str().unwrap()).collect::<Vec<_>>(),
        vec!["09:00", "10:00", "11:00"]
    );
    assert_eq!(
        tomorrow_slots.iter().map(|s| s["is_available"].as_bool().unwrap()).collect::<Vec<_>>(),
        vec![true, false, false]
    );
}

#[tokio::test]
async fn time_off_removes_whole_days() {
    let server = MockServer::start().await;
    let (config, _patient, token) = setup(&server, Role::Patient);
    let therapist_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    mount_therapist(
        &server,
        therapist_id,
        Some(MockSupabaseResponses::therapist_profile(therapist_id, every_day("09:00 - 10:00"))),
    )
    .await;
    mount_empty(&server, "therapist_availability").await;
    mount_empty(&server, "therapist_busy_intervals").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/time_off_periods"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "therapist_id": therapist_id,
            "start_date": today + Duration::days(2),
            "end_date": today + Duration::days(4),
            "reason": "Vacation",
            "created_at": null
        }])))
        .mount(&server)
        .await;

    let response = get_available_slots(State(config), Path(therapist_id), create_auth_header(&token))
        .await
        .unwrap()
        .0;

    assert_eq!(response["slots"].as_array().unwrap().len(), 31 - 3);
}

#[tokio::test]
async fn relational_rules_back_fill_missing_days() {
    let server = MockServer::start().await;
    let (config, _patient, token) = setup(&server, Role::Patient);
    let therapist_id = Uuid::new_v4();

    mount_therapist(
        &server,
        therapist_id,
        Some(MockSupabaseResponses::therapist_profile(therapist_id, json!(null))),
    )
    .await;
    mount_empty(&server, "time_off_periods").await;
    mount_empty(&server, "therapist_busy_intervals").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/therapist_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "therapist_id": therapist_id,
            "day_of_week": "wednesday",
            "start_time": "14:00:00",
            "end_time": "16:00:00",
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        }])))
        .mount(&server)
        .await;

    let response = get_available_slots(State(config), Path(therapist_id), create_auth_header(&token))
        .await
        .unwrap()
        .0;

    let slots = response["slots"].as_array().unwrap();
    assert!(!slots.is_empty());
    assert!(slots.iter().all(|s| {
        let date = NaiveDate::parse_from_str(s["date"].as_str().unwrap(), "%Y-%m-%d").unwrap();
        date.format("%A").to_string() == "Wednesday"
    }));
}

#[tokio::test]
async fn therapist_without_profile_has_no_slots() {
    let server = MockServer::start().await;
    let (config, _patient, token) = setup(&server, Role::Patient);
    let therapist_id = Uuid::new_v4();
    mount_therapist(&server, therapist_id, None).await;

    let response = get_available_slots(State(config), Path(therapist_id), create_auth_header(&token))
        .await
        .unwrap()
        .0;

    assert_eq!(response["slots"], json!([]));
}

#[tokio::test]
async fn slots_for_non_therapist_is_not_found() {
    let server = MockServer::start().await;
    let (config, _patient, token) = setup(&server, Role::Patient);
    let other_patient = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_row(other_patient, "p2@example.com", "Pat Two", Role::Patient)
        ])))
        .mount(&server)
        .await;
    mount_empty(&server, "therapist_profiles").await;

    let result = get_available_slots(State(config), Path(other_patient), create_auth_header(&token)).await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn list_therapists_forwards_filters() {
    let server = MockServer::start().await;
    let (config, _user, _token) = setup(&server, Role::Patient);
    let therapist_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapist_directory"))
        .and(query_param("profile_completed", "eq.true"))
        .and(query_param("consultation_mode", "in.(offline,both)"))
        .and(query_param("is_verified", "eq.true"))
        .and(query_param("order", "years_of_experience.desc.nullslast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::therapist_profile(therapist_id, json!({}))
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let query = TherapistListQuery {
        mode: Some(ConsultationMode::Offline),
        verified_only: Some(true),
        sort_by: Some(TherapistSort::Experience),
        ..Default::default()
    };
    let response = list_therapists(State(config), Query(query)).await.unwrap().0;

    assert_eq!(response["results"].as_array().unwrap().len(), 1);
    assert_eq!(response["has_more"], false);
    assert_eq!(response["page_size"], 10);
}

#[tokio::test]
async fn time_off_with_inverted_range_is_rejected_without_writing() {
    let server = MockServer::start().await;
    let (config, therapist, token) = setup(&server, Role::Therapist);

    Mock::given(method("POST"))
        .and(path("/rest/v1/time_off_periods"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let today = Utc::now().date_naive();
    let request = CreateTimeOffRequest {
        start_date: today + Duration::days(5),
        end_date: today + Duration::days(2),
        reason: None,
    };
    let result = create_time_off(
        State(config),
        create_auth_header(&token),
        Extension(therapist.to_user()),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::FieldErrors(fields)) if fields.contains_key("end_date"));
}

#[tokio::test]
async fn overlapping_availability_rule_is_rejected() {
    let server = MockServer::start().await;
    let (config, therapist, token) = setup(&server, Role::Therapist);

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapist_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "therapist_id": therapist.id,
            "day_of_week": "monday",
            "start_time": "09:00:00",
            "end_time": "12:00:00",
            "is_active": true,
            "created_at": null
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/therapist_availability"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let request = CreateAvailabilityRequest {
        day_of_week: DayOfWeek::Monday,
        start_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
    };
    let result = create_availability(
        State(config),
        create_auth_header(&token),
        Extension(therapist.to_user()),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg.contains("Monday"));
}

#[tokio::test]
async fn patients_cannot_manage_availability() {
    let server = MockServer::start().await;
    let (config, patient, token) = setup(&server, Role::Patient);

    let result = list_time_off(State(config), create_auth_header(&token), Extension(patient.to_user())).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn deleting_someone_elses_time_off_is_forbidden() {
    let server = MockServer::start().await;
    let (config, therapist, token) = setup(&server, Role::Therapist);
    let time_off_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/time_off_periods"))
        .and(query_param("id", format!("eq.{}", time_off_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": time_off_id,
            "therapist_id": Uuid::new_v4(),
            "start_date": "2030-01-01",
            "end_date": "2030-01-02",
            "reason": null,
            "created_at": null
        }])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/time_off_periods"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let user: User = therapist.to_user();
    let result = delete_time_off(State(config), Path(time_off_id), create_auth_header(&token), Extension(user)).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}
