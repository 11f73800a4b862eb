use reqwest::Method;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};
use shared_models::auth::User;

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentFeedback, AppointmentStatus, FeedbackRequest};

pub struct FeedbackService {
    supabase: SupabaseClient,
}

impl FeedbackService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// One feedback row per completed appointment, written by its patient.
    pub async fn submit_feedback(
        &self,
        patient: &User,
        appointment_id: Uuid,
        request: FeedbackRequest,
        auth_token: &str,
    ) -> Result<AppointmentFeedback, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&patient_id=eq.{}",
            appointment_id, patient.id
        );
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        let appointment = rows.into_iter().next().ok_or(AppointmentError::NotFound)?;

        if appointment.status != AppointmentStatus::Completed {
            return Err(AppointmentError::FeedbackNotAllowed);
        }

        let existing_path = format!(
            "/rest/v1/appointment_feedback?appointment_id=eq.{}&select=id",
            appointment_id
        );
        let existing: Vec<serde_json::Value> = self.supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await?;
        if !existing.is_empty() {
            return Err(AppointmentError::FeedbackAlreadySubmitted);
        }

        if !(1..=5).contains(&request.rating) {
            return Err(AppointmentError::InvalidRating);
        }

        let body = json!({
            "appointment_id": appointment_id,
            "patient_id": patient.id,
            "rating": request.rating,
            "feedback_text": request.feedback_text.as_deref().map(str::trim).filter(|t| !t.is_empty()),
            "would_recommend": request.would_recommend.unwrap_or(true),
        });

        let created: Vec<AppointmentFeedback> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointment_feedback",
                Some(auth_token),
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(|e| match e {
                SupabaseError::Conflict { .. } => {
                    warn!("Concurrent feedback for appointment {}", appointment_id);
                    AppointmentError::FeedbackAlreadySubmitted
                }
                other => other.into(),
            })?;

        let feedback = created
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Database("Failed to store feedback".to_string()))?;

        info!("Feedback {} ({}/5) stored for appointment {}", feedback.id, feedback.rating, appointment_id);
        Ok(feedback)
    }
}
