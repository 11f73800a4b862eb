use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use therapist_cell::models::hhmm;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub therapist_id: Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i32,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub session_mode: SessionMode,
    pub reason_for_visit: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub meeting_link: Option<String>,
    pub therapist_notes: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentType {
    #[default]
    Initial,
    #[serde(alias = "follow_up")]
    Followup,
    Emergency,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Online,
    Offline,
}

/// Append-only audit row written by the storage functions on every transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentHistory {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub changed_by: Option<Uuid>,
    pub action: HistoryAction,
    pub old_status: Option<AppointmentStatus>,
    pub new_status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Created => "created",
            HistoryAction::Confirmed => "confirmed",
            HistoryAction::Cancelled => "cancelled",
            HistoryAction::Completed => "completed",
            HistoryAction::NoShow => "no_show",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentFeedback {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub rating: i16,
    pub feedback_text: Option<String>,
    pub would_recommend: bool,
    pub created_at: DateTime<Utc>,
}

/// Appointment plus the derived flags clients render.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub is_upcoming: bool,
    pub is_past: bool,
    pub can_cancel: bool,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub therapist_id: Uuid,
    pub appointment_date: NaiveDate,
    #[serde(deserialize_with = "hhmm::deserialize")]
    pub start_time: NaiveTime,
    /// When set, the duration is derived from it instead of `duration_minutes`.
    #[serde(default, deserialize_with = "hhmm::option::deserialize")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub session_mode: SessionMode,
    #[serde(default)]
    pub reason_for_visit: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelAppointmentRequest {
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfirmAppointmentRequest {
    pub meeting_link: Option<String>,
    pub therapist_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub rating: i32,
    #[serde(default)]
    pub feedback_text: Option<String>,
    #[serde(default)]
    pub would_recommend: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListFilter {
    Today,
    Upcoming,
    Past,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
    pub filter: Option<ListFilter>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

// ==============================================================================
// STATISTICS
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppointmentStats {
    pub total_appointments: usize,
    /// Distinct patients; only computed for therapists.
    pub total_patients: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub no_show: usize,
    pub upcoming: usize,
    pub today_sessions: usize,
    pub completed_this_week: usize,
}

/// Projection fetched for statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentStatRow {
    pub patient_id: Uuid,
    pub appointment_date: NaiveDate,
    pub status: AppointmentStatus,
}
