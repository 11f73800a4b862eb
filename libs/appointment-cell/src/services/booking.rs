use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};
use shared_models::auth::User;
use therapist_cell::services::availability::AvailabilityService;
use therapist_cell::services::directory::DirectoryService;

use crate::error::AppointmentError;
use crate::models::{
    Appointment, AppointmentHistory, AppointmentStatus, CancelAppointmentRequest,
    ConfirmAppointmentRequest, CreateAppointmentRequest, HistoryAction,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::notification::NotificationService;
use crate::services::validation::{validate_booking, validate_request, BookingContext};

/// Raised by `transition_appointment` when the row no longer has the expected status.
const STALE_STATUS_CODE: &str = "PT409";

pub struct AppointmentBookingService {
    supabase: SupabaseClient,
    directory: DirectoryService,
    availability: AvailabilityService,
    lifecycle: AppointmentLifecycleService,
    notifications: NotificationService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: DirectoryService::new(config),
            availability: AvailabilityService::new(config),
            lifecycle: AppointmentLifecycleService::new(),
            notifications: NotificationService::new(config),
        }
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    /// Validates the request against the therapist's schedule and books it.
    ///
    /// The insert and its `created` history row happen in one storage call;
    /// the exclusion constraint on appointments settles races between two
    /// requests that both passed validation.
    pub async fn book_appointment(
        &self,
        patient: &User,
        request: CreateAppointmentRequest,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking request from patient {} for therapist {}", patient.id, request.therapist_id);

        let slot = validate_request(&request, now.naive_utc())?;

        let (therapist, profile, rules, time_off, booked, patient_account) = futures::try_join!(
            self.directory.get_account(request.therapist_id, auth_token),
            self.directory.get_profile(request.therapist_id, auth_token),
            self.availability.get_rules(request.therapist_id, auth_token),
            self.availability.get_time_off(request.therapist_id, slot.date, slot.date, auth_token),
            self.availability.get_booked_intervals(request.therapist_id, slot.date, slot.date, auth_token),
            self.directory.get_account(patient.id, auth_token)
        )?;

        validate_booking(&slot, &BookingContext {
            therapist: therapist.as_ref(),
            profile: profile.as_ref(),
            rules: &rules,
            time_off: &time_off,
            booked: &booked,
        })?;

        let contact_phone = non_blank(request.contact_phone)
            .or_else(|| patient_account.as_ref().and_then(|a| a.phone_number.clone()));
        let contact_email = non_blank(request.contact_email)
            .or_else(|| patient_account.as_ref().map(|a| a.email.clone()))
            .or_else(|| patient.email.clone());

        let record = json!({
            "patient_id": patient.id,
            "therapist_id": request.therapist_id,
            "appointment_date": slot.date,
            "start_time": slot.start_time.format("%H:%M:%S").to_string(),
            "end_time": slot.end_time.format("%H:%M:%S").to_string(),
            "duration_minutes": slot.duration_minutes,
            "appointment_type": request.appointment_type,
            "session_mode": request.session_mode,
            "status": AppointmentStatus::Pending,
            "reason_for_visit": non_blank(request.reason_for_visit),
            "contact_phone": contact_phone,
            "contact_email": contact_email,
        });

        let appointment: Appointment = self
            .supabase
            .rpc(
                "create_appointment_with_history",
                Some(auth_token),
                json!({
                    "p_appointment": record,
                    "p_changed_by": patient.id,
                    "p_notes": "Appointment created by patient",
                }),
            )
            .await
            .map_err(|e| match e {
                SupabaseError::Conflict { .. } => {
                    warn!("Slot {} {} for therapist {} taken concurrently", slot.date, slot.start_time, request.therapist_id);
                    AppointmentError::SlotTaken
                }
                other => other.into(),
            })?;

        info!(
            "Appointment {} booked: patient {} with therapist {} on {} at {}",
            appointment.id, patient.id, appointment.therapist_id, appointment.appointment_date, appointment.start_time
        );
        Ok(appointment)
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    pub async fn get_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Only the patient and the therapist of an appointment may see it.
    pub async fn get_for_participant(
        &self,
        user: &User,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        if !appointment.is_participant(user.id) {
            return Err(AppointmentError::Forbidden(
                "You don't have permission to view this appointment".to_string(),
            ));
        }
        Ok(appointment)
    }

    pub async fn get_history(
        &self,
        user: &User,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AppointmentHistory>, AppointmentError> {
        self.get_for_participant(user, appointment_id, auth_token).await?;

        let path = format!(
            "/rest/v1/appointment_history?appointment_id=eq.{}&order=created_at.asc",
            appointment_id
        );
        Ok(self.supabase.request(Method::GET, &path, Some(auth_token), None).await?)
    }

    // ==========================================================================
    // TRANSITIONS
    // ==========================================================================

    pub async fn confirm_appointment(
        &self,
        therapist: &User,
        appointment_id: Uuid,
        request: ConfirmAppointmentRequest,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        if appointment.therapist_id != therapist.id {
            return Err(AppointmentError::NotFound);
        }

        let meeting_link = self
            .lifecycle
            .validate_confirmation(&appointment, request.meeting_link.as_deref())?;

        let mut changes = json!({ "confirmed_at": now });
        if let Some(link) = meeting_link {
            changes["meeting_link"] = json!(link);
        }
        if let Some(notes) = non_blank(request.therapist_notes) {
            changes["therapist_notes"] = json!(notes);
        }

        let confirmed = self
            .transition(
                &appointment,
                AppointmentStatus::Confirmed,
                HistoryAction::Confirmed,
                therapist.id,
                "Appointment confirmed by therapist".to_string(),
                changes,
                auth_token,
            )
            .await?;

        info!("Appointment {} confirmed by therapist {}", appointment_id, therapist.id);
        Ok(confirmed)
    }

    /// Cancels on behalf of either participant and queues the email notices.
    pub async fn cancel_appointment(
        &self,
        user: &User,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        if !appointment.is_participant(user.id) {
            return Err(AppointmentError::Forbidden(
                "You don't have permission to cancel this appointment".to_string(),
            ));
        }

        let reason = self.lifecycle.validate_cancellation(
            &appointment,
            request.cancellation_reason.as_deref(),
            now,
        )?;

        let cancelled = self
            .transition(
                &appointment,
                AppointmentStatus::Cancelled,
                HistoryAction::Cancelled,
                user.id,
                format!("Cancelled: {}", reason),
                json!({
                    "cancelled_by": user.id,
                    "cancellation_reason": reason,
                    "cancelled_at": now,
                }),
                auth_token,
            )
            .await?;

        info!("Appointment {} cancelled by {}", appointment_id, user.id);

        let notifications = self.notifications.clone();
        let snapshot = cancelled.clone();
        let cancelled_by = user.id;
        let token = auth_token.to_string();
        tokio::spawn(async move {
            notifications.notify_cancellation(snapshot, cancelled_by, token).await;
        });

        Ok(cancelled)
    }

    /// Compare-and-set on status plus the history insert, as one storage call.
    #[allow(clippy::too_many_arguments)]
    async fn transition(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
        action: HistoryAction,
        changed_by: Uuid,
        notes: String,
        changes: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.supabase
            .rpc(
                "transition_appointment",
                Some(auth_token),
                json!({
                    "p_appointment_id": appointment.id,
                    "p_expected_status": appointment.status,
                    "p_new_status": new_status,
                    "p_changed_by": changed_by,
                    "p_action": action.as_str(),
                    "p_notes": notes,
                    "p_changes": changes,
                }),
            )
            .await
            .map_err(|e| match e {
                SupabaseError::Conflict { ref code, .. } if code == STALE_STATUS_CODE => {
                    warn!("Appointment {} changed status before {}", appointment.id, action.as_str());
                    AppointmentError::StatusChanged
                }
                other => other.into(),
            })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
