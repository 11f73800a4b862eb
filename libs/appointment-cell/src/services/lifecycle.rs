use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::Url;
use tracing::{debug, warn};

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentStatus, AppointmentView};

pub const CANCELLATION_NOTICE_HOURS: i64 = 24;
pub const MIN_CANCELLATION_REASON_CHARS: usize = 10;
pub const MAX_CANCELLATION_REASON_CHARS: usize = 500;

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
        action: &'static str,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                action,
                status: current_status,
            });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Cancelled,
                AppointmentStatus::Completed,
                AppointmentStatus::NoShow,
            ],
            // Terminal states
            AppointmentStatus::Cancelled
            | AppointmentStatus::Completed
            | AppointmentStatus::NoShow => vec![],
        }
    }

    /// Cancellation checks run in this order: already cancelled, then the
    /// notice window (or a terminal status), then the reason text. Returns
    /// the trimmed reason.
    pub fn validate_cancellation(
        &self,
        appointment: &Appointment,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, AppointmentError> {
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(AppointmentError::AlreadyCancelled);
        }

        if !appointment.can_cancel(now) {
            if !appointment.status.is_active() {
                return Err(AppointmentError::InvalidStatusTransition {
                    action: "cancel",
                    status: appointment.status,
                });
            }
            return Err(AppointmentError::CancellationWindowClosed);
        }

        validate_cancellation_reason(reason)
    }

    /// Confirmation requires `pending`; the optional meeting link must be an http(s) URL.
    pub fn validate_confirmation(
        &self,
        appointment: &Appointment,
        meeting_link: Option<&str>,
    ) -> Result<Option<String>, AppointmentError> {
        self.validate_status_transition(appointment.status, AppointmentStatus::Confirmed, "confirm")?;

        match meeting_link.map(str::trim).filter(|link| !link.is_empty()) {
            Some(link) => {
                let parsed = Url::parse(link).map_err(|_| AppointmentError::InvalidMeetingLink)?;
                if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
                    return Err(AppointmentError::InvalidMeetingLink);
                }
                Ok(Some(link.to_string()))
            }
            None => Ok(None),
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_cancellation_reason(reason: Option<&str>) -> Result<String, AppointmentError> {
    let reason = reason.map(str::trim).unwrap_or_default();
    let chars = reason.chars().count();

    if chars < MIN_CANCELLATION_REASON_CHARS {
        return Err(AppointmentError::InvalidCancellationReason(format!(
            "Cancellation reason must be at least {} characters",
            MIN_CANCELLATION_REASON_CHARS
        )));
    }
    if chars > MAX_CANCELLATION_REASON_CHARS {
        return Err(AppointmentError::InvalidCancellationReason(format!(
            "Cancellation reason must be at most {} characters",
            MAX_CANCELLATION_REASON_CHARS
        )));
    }

    Ok(reason.to_string())
}

impl AppointmentStatus {
    /// Pending and confirmed appointments hold their slot.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

impl Appointment {
    pub fn start_datetime(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.appointment_date.and_time(self.start_time))
    }

    /// Only pending and confirmed appointments can be cancelled. `no_show`
    /// is terminal like `cancelled` and `completed` and has no outgoing
    /// transition.
    pub fn can_cancel(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active()
            && self.start_datetime() - now >= Duration::hours(CANCELLATION_NOTICE_HOURS)
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active() && self.start_datetime() > now
    }

    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.start_datetime() < now
    }

    pub fn is_participant(&self, user_id: uuid::Uuid) -> bool {
        self.patient_id == user_id || self.therapist_id == user_id
    }

    pub fn into_view(self, now: DateTime<Utc>) -> AppointmentView {
        AppointmentView {
            is_upcoming: self.is_upcoming(now),
            is_past: self.is_past(now),
            can_cancel: self.can_cancel(now),
            appointment: self,
        }
    }
}
