use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use shared_database::SupabaseError;
use shared_models::auth::Role;
use shared_models::error::AppError;

// ==============================================================================
// ACCOUNTS AND PROFILES
// ==============================================================================

/// Row of the `users` table as exposed to the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationMode {
    Online,
    Offline,
    Both,
}

impl ConsultationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationMode::Online => "online",
            ConsultationMode::Offline => "offline",
            ConsultationMode::Both => "both",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapistProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Present when read through `therapist_directory`.
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub profession_type: Option<String>,
    #[serde(default)]
    pub specialization_tags: Vec<String>,
    #[serde(default)]
    pub languages_spoken: Vec<String>,
    pub consultation_mode: ConsultationMode,
    pub consultation_fees: Option<f64>,
    pub years_of_experience: Option<i32>,
    pub bio: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub profile_completed: bool,
    /// Free-form weekly schedule, parsed with `WeeklySchedule::from_json`.
    #[serde(default)]
    pub availability_slots: Value,
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Case-insensitive; accepts full names and three-letter abbreviations.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Some(DayOfWeek::Monday),
            "tuesday" | "tue" => Some(DayOfWeek::Tuesday),
            "wednesday" | "wed" => Some(DayOfWeek::Wednesday),
            "thursday" | "thu" => Some(DayOfWeek::Thursday),
            "friday" | "fri" => Some(DayOfWeek::Friday),
            "saturday" | "sat" => Some(DayOfWeek::Saturday),
            "sunday" | "sun" => Some(DayOfWeek::Sunday),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }

    pub fn storage_name(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Recurring weekly availability rule (`therapist_availability`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapistAvailability {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeOffPeriod {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TimeOffPeriod {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Occupied interval read from `therapist_busy_intervals`.
///
/// The view only exposes timing and status so patients can see when a
/// therapist is busy without reading other patients' appointments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedInterval {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
}

impl BookedInterval {
    /// Only pending and confirmed appointments hold their slot.
    pub fn blocks_slot(&self) -> bool {
        matches!(self.status.as_str(), "pending" | "confirmed")
    }

    pub fn overlaps(&self, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> bool {
        self.appointment_date == date
            && self.blocks_slot()
            && crate::services::schedule::intervals_overlap(self.start_time, self.end_time, start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub is_available: bool,
}

/// `HH:MM` wall-clock formatting for slot boundaries.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if !raw.trim().is_empty() => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
                    .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

// ==============================================================================
// REQUESTS AND RESPONSES
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateTimeOffRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TherapistListQuery {
    pub specialization: Option<String>,
    pub mode: Option<ConsultationMode>,
    pub verified_only: Option<bool>,
    pub sort_by: Option<TherapistSort>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TherapistSort {
    #[default]
    Name,
    Experience,
    FeesLow,
    FeesHigh,
}

#[derive(Debug, Clone, Serialize)]
pub struct TherapistSlots {
    pub therapist_id: Uuid,
    pub therapist_name: String,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyAvailability {
    pub therapist_id: Uuid,
    pub therapist_name: String,
    /// Day name to `"HH:MM - HH:MM"` ranges, after parsing and cleanup.
    pub schedule: Value,
    pub availability: Vec<TherapistAvailability>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum TherapistError {
    #[error("Therapist not found")]
    NotFound,

    #[error("Selected user is not a therapist")]
    NotATherapist,

    #[error("Therapist profile not found")]
    ProfileNotFound,

    #[error("Start time must be before end time")]
    InvalidTimeRange,

    #[error("Start date must be on or before end date")]
    InvalidDateRange,

    #[error("Availability overlaps an existing rule on {0}")]
    OverlappingAvailability(DayOfWeek),

    #[error("Time-off period not found")]
    TimeOffNotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<SupabaseError> for TherapistError {
    fn from(e: SupabaseError) -> Self {
        TherapistError::Database(e.to_string())
    }
}

impl From<TherapistError> for AppError {
    fn from(e: TherapistError) -> Self {
        match e {
            TherapistError::NotFound
            | TherapistError::NotATherapist
            | TherapistError::ProfileNotFound
            | TherapistError::TimeOffNotFound => AppError::NotFound(e.to_string()),
            TherapistError::InvalidTimeRange => AppError::field("end_time", e.to_string()),
            TherapistError::InvalidDateRange => AppError::field("end_date", e.to_string()),
            TherapistError::OverlappingAvailability(_) => AppError::BadRequest(e.to_string()),
            TherapistError::Forbidden(msg) => AppError::Forbidden(msg),
            TherapistError::Database(msg) => AppError::Database(msg),
        }
    }
}
