use std::sync::Arc;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub llm_api_url: String,
    pub max_dynamic_questions: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            llm_api_url: "http://localhost:11434/api/generate".to_string(),
            max_dynamic_questions: 5,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            llm_api_url: self.llm_api_url.clone(),
            llm_model: "llama2".to_string(),
            llm_timeout_secs: 5,
            max_dynamic_questions: self.max_dynamic_questions,
            email_api_url: String::new(),
            email_api_key: String::new(),
            email_from: "no-reply@mindcare.test".to_string(),
            server_port: 3000,
        }
    }

    /// Config whose store and generator both point at one mock server.
    pub fn with_mock_server(uri: &str) -> AppConfig {
        let mut config = Self::default().to_app_config();
        config.supabase_url = uri.to_string();
        config.llm_api_url = format!("{}/api/generate", uri);
        config
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
        }
    }

    pub fn therapist(email: &str) -> Self {
        Self::new(email, Role::Therapist)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: Some(self.email.clone()),
            role: Some(self.role),
            metadata: Some(json!({ "role": self.role, "full_name": "Test User" })),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "app_metadata": { "role": user.role },
            "user_metadata": { "full_name": "Test User" },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        // HMAC accepts keys of any length, so the error arm is unreachable.
        let signature_encoded = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map(|mut mac| {
                mac.update(signing_input.as_bytes());
                general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
            })
            .unwrap_or_default();

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// PostgREST row fixtures shared by the cell test suites.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_row(user_id: Uuid, email: &str, full_name: &str, role: Role) -> Value {
        json!({
            "id": user_id,
            "email": email,
            "full_name": full_name,
            "role": role,
            "phone_number": "+919876543210"
        })
    }

    pub fn therapist_profile(user_id: Uuid, availability_slots: Value) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "full_name": "Dr. Asha Rao",
            "email": "asha@example.com",
            "profession_type": "psychologist",
            "specialization_tags": ["anxiety", "depression"],
            "languages_spoken": ["English"],
            "consultation_mode": "both",
            "consultation_fees": 1500.0,
            "years_of_experience": 8,
            "bio": "CBT-focused clinical psychologist",
            "is_verified": true,
            "profile_completed": true,
            "availability_slots": availability_slots
        })
    }

    pub fn appointment(
        patient_id: Uuid,
        therapist_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        duration_minutes: i64,
        status: &str,
    ) -> Value {
        let end = start + Duration::minutes(duration_minutes);
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "therapist_id": therapist_id,
            "appointment_date": date,
            "start_time": start.format("%H:%M:%S").to_string(),
            "end_time": end.format("%H:%M:%S").to_string(),
            "duration_minutes": duration_minutes,
            "appointment_type": "initial",
            "status": status,
            "session_mode": "online",
            "reason_for_visit": "Persistent anxiety at work",
            "contact_phone": "+919876543210",
            "contact_email": "patient@example.com",
            "meeting_link": null,
            "therapist_notes": null,
            "cancelled_by": null,
            "cancellation_reason": null,
            "cancelled_at": null,
            "confirmed_at": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn survey(survey_id: Uuid, patient_id: Uuid, status: &str) -> Value {
        json!({
            "id": survey_id,
            "patient_id": patient_id,
            "status": status,
            "started_at": "2024-01-01T00:00:00Z",
            "completed_at": null,
            "analysis_summary": null,
            "risk_level": null
        })
    }

    pub fn journal_entry(entry_id: Uuid, patient_id: Uuid, mood: &str, mood_intensity: i16) -> Value {
        json!({
            "id": entry_id,
            "patient_id": patient_id,
            "title": "Evening check-in",
            "content": "Slept badly, but the walk helped.",
            "mood": mood,
            "mood_intensity": mood_intensity,
            "tags": ["sleep"],
            "created_at": "2024-01-01T20:00:00Z",
            "updated_at": "2024-01-01T20:00:00Z"
        })
    }

    pub fn blog_post(post_id: Uuid, author_id: Uuid, slug: &str, status: &str) -> Value {
        json!({
            "id": post_id,
            "slug": slug,
            "author_id": author_id,
            "author": { "id": author_id, "full_name": "Dr. Asha Rao", "is_verified": true },
            "title": "Grounding techniques for anxious days",
            "content": "word ".repeat(450),
            "excerpt": "Five small grounding exercises you can use when anxiety spikes at work.",
            "category": "anxiety",
            "tags": ["anxiety", "grounding"],
            "cover_image": null,
            "status": status,
            "approved_by": null,
            "approved_at": null,
            "rejection_reason": null,
            "views_count": 10,
            "likes_count": 2,
            "meta_description": "",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "published_at": if status == "published" { json!("2024-01-02T00:00:00Z") } else { Value::Null }
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "code": code,
            "message": message,
            "details": null,
            "hint": null
        })
    }
}
