use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use therapist_cell::models::UserAccount;
use therapist_cell::services::directory::DirectoryService;

use crate::models::Appointment;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Missing account for {0}")]
    MissingAccount(Uuid),

    #[error("Account lookup failed: {0}")]
    Lookup(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Builds the two cancellation notices: one for the other participant and a
/// receipt for whoever cancelled.
pub fn build_cancellation_notices(
    appointment: &Appointment,
    patient: &UserAccount,
    therapist: &UserAccount,
    cancelled_by_patient: bool,
) -> [EmailMessage; 2] {
    let when = format!(
        "{} at {}",
        appointment.appointment_date.format("%A, %B %d, %Y"),
        appointment.start_time.format("%H:%M")
    );
    let reason = appointment
        .cancellation_reason
        .as_deref()
        .unwrap_or("No reason provided");

    let (actor, counterpart) = if cancelled_by_patient {
        (patient, therapist)
    } else {
        (therapist, patient)
    };

    let notice = EmailMessage {
        to: counterpart.email.clone(),
        subject: format!("Appointment Cancelled by {}", actor.full_name),
        body: format!(
            "Hello {},\n\nYour appointment on {} has been cancelled by {}.\n\nReason: {}\n\nYou can book a new session at any time.\n",
            counterpart.full_name, when, actor.full_name, reason
        ),
    };

    let receipt = if cancelled_by_patient {
        EmailMessage {
            to: actor.email.clone(),
            subject: "Your Appointment Has Been Cancelled".to_string(),
            body: format!(
                "Hello {},\n\nYour appointment with {} on {} has been cancelled.\n\nReason: {}\n",
                actor.full_name, counterpart.full_name, when, reason
            ),
        }
    } else {
        EmailMessage {
            to: actor.email.clone(),
            subject: "You Cancelled an Appointment".to_string(),
            body: format!(
                "Hello {},\n\nYou cancelled the appointment with {} on {}.\n\nReason: {}\n",
                actor.full_name, counterpart.full_name, when, reason
            ),
        }
    };

    [notice, receipt]
}

#[derive(Clone)]
pub struct NotificationService {
    http_client: Client,
    directory: DirectoryService,
    email_api_url: String,
    email_api_key: String,
    email_from: String,
    enabled: bool,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http_client: Client::new(),
            directory: DirectoryService::new(config),
            email_api_url: config.email_api_url.clone(),
            email_api_key: config.email_api_key.clone(),
            email_from: config.email_from.clone(),
            enabled: config.is_email_configured(),
        }
    }

    /// Best effort; failures are logged and never reach the caller.
    pub async fn notify_cancellation(&self, appointment: Appointment, cancelled_by: Uuid, auth_token: String) {
        if let Err(e) = self.try_notify_cancellation(&appointment, cancelled_by, &auth_token).await {
            error!("Cancellation notices for appointment {} failed: {}", appointment.id, e);
        }
    }

    async fn try_notify_cancellation(
        &self,
        appointment: &Appointment,
        cancelled_by: Uuid,
        auth_token: &str,
    ) -> Result<(), NotificationError> {
        let (patient, therapist) = futures::try_join!(
            self.directory.get_account(appointment.patient_id, auth_token),
            self.directory.get_account(appointment.therapist_id, auth_token)
        )
        .map_err(|e| NotificationError::Lookup(e.to_string()))?;

        let patient = patient.ok_or(NotificationError::MissingAccount(appointment.patient_id))?;
        let therapist = therapist.ok_or(NotificationError::MissingAccount(appointment.therapist_id))?;

        let cancelled_by_patient = cancelled_by == appointment.patient_id;
        for message in build_cancellation_notices(appointment, &patient, &therapist, cancelled_by_patient) {
            if let Err(e) = self.send(&message).await {
                warn!("Failed to send '{}' to {}: {}", message.subject, message.to, e);
            }
        }

        Ok(())
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        if !self.enabled {
            info!("Email delivery disabled; skipping '{}' to {}", message.subject, message.to);
            return Ok(());
        }

        debug!("Sending '{}' to {}", message.subject, message.to);

        let response = self
            .http_client
            .post(&self.email_api_url)
            .bearer_auth(&self.email_api_key)
            .json(&json!({
                "from": self.email_from,
                "to": [message.to],
                "subject": message.subject,
                "text": message.body,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use shared_models::auth::Role;

    use crate::models::{AppointmentStatus, AppointmentType, SessionMode};

    fn account(name: &str, email: &str, role: Role) -> UserAccount {
        UserAccount {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: name.to_string(),
            role,
            phone_number: None,
        }
    }

    fn cancelled(patient: &UserAccount, therapist: &UserAccount) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            therapist_id: therapist.id,
            appointment_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            duration_minutes: 60,
            appointment_type: AppointmentType::Initial,
            status: AppointmentStatus::Cancelled,
            session_mode: SessionMode::Online,
            reason_for_visit: None,
            contact_phone: None,
            contact_email: None,
            meeting_link: None,
            therapist_notes: None,
            cancelled_by: Some(patient.id),
            cancellation_reason: Some("Travelling for work that week".into()),
            cancelled_at: Some(Utc::now()),
            confirmed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn patient_cancellation_notifies_therapist_and_sends_receipt() {
        let patient = account("Ravi Kumar", "ravi@example.com", Role::Patient);
        let therapist = account("Dr. Asha Rao", "asha@example.com", Role::Therapist);
        let appointment = cancelled(&patient, &therapist);

        let [notice, receipt] = build_cancellation_notices(&appointment, &patient, &therapist, true);

        assert_eq!(notice.to, "asha@example.com");
        assert_eq!(notice.subject, "Appointment Cancelled by Ravi Kumar");
        assert!(notice.body.contains("Monday, January 08, 2024 at 10:00"));
        assert!(notice.body.contains("Travelling for work that week"));

        assert_eq!(receipt.to, "ravi@example.com");
        assert_eq!(receipt.subject, "Your Appointment Has Been Cancelled");
    }

    #[test]
    fn therapist_cancellation_swaps_roles() {
        let patient = account("Ravi Kumar", "ravi@example.com", Role::Patient);
        let therapist = account("Dr. Asha Rao", "asha@example.com", Role::Therapist);
        let appointment = cancelled(&patient, &therapist);

        let [notice, receipt] = build_cancellation_notices(&appointment, &patient, &therapist, false);

        assert_eq!(notice.to, "ravi@example.com");
        assert_eq!(notice.subject, "Appointment Cancelled by Dr. Asha Rao");
        assert_eq!(receipt.to, "asha@example.com");
        assert_eq!(receipt.subject, "You Cancelled an Appointment");
    }
}
