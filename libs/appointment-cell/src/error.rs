use thiserror::Error;

use shared_database::SupabaseError;
use shared_models::error::AppError;
use therapist_cell::models::TherapistError;

use crate::models::AppointmentStatus;

#[derive(Error, Debug)]
pub enum AppointmentError {
    // Booking validation, in the order the checks run.
    #[error("Cannot book appointments in the past")]
    AppointmentInPast,

    #[error("{0}")]
    InvalidDuration(String),

    #[error("Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.")]
    InvalidContactPhone,

    #[error("Therapist not found")]
    TherapistNotFound,

    #[error("Selected user is not a therapist")]
    NotATherapist,

    #[error("Therapist profile not found")]
    TherapistProfileMissing,

    #[error("Therapist is not available at this time on {day}")]
    OutsideAvailability { day: &'static str },

    #[error("Therapist is not available on this date")]
    TherapistOnLeave,

    #[error("This time slot is already booked")]
    SlotTaken,

    // Lifecycle
    #[error("Appointment not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Cannot cancel appointment less than 24 hours before scheduled time")]
    CancellationWindowClosed,

    #[error("Cannot {action} appointment with status: {status}")]
    InvalidStatusTransition {
        action: &'static str,
        status: AppointmentStatus,
    },

    #[error("Appointment was changed by another request, please reload and retry")]
    StatusChanged,

    #[error("{0}")]
    InvalidCancellationReason(String),

    #[error("Enter a valid URL.")]
    InvalidMeetingLink,

    // Feedback
    #[error("Can only submit feedback for completed appointments")]
    FeedbackNotAllowed,

    #[error("Feedback already submitted for this appointment")]
    FeedbackAlreadySubmitted,

    #[error("Rating must be between 1 and 5")]
    InvalidRating,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<SupabaseError> for AppointmentError {
    fn from(e: SupabaseError) -> Self {
        AppointmentError::Database(e.to_string())
    }
}

impl From<TherapistError> for AppointmentError {
    fn from(e: TherapistError) -> Self {
        match e {
            TherapistError::NotFound => AppointmentError::TherapistNotFound,
            TherapistError::NotATherapist => AppointmentError::NotATherapist,
            TherapistError::ProfileNotFound => AppointmentError::TherapistProfileMissing,
            other => AppointmentError::Database(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        let message = e.to_string();
        match e {
            AppointmentError::AppointmentInPast | AppointmentError::TherapistOnLeave => {
                AppError::field("appointment_date", message)
            }
            AppointmentError::InvalidDuration(_) => AppError::field("duration_minutes", message),
            AppointmentError::InvalidContactPhone => AppError::field("contact_phone", message),
            AppointmentError::NotATherapist | AppointmentError::TherapistProfileMissing => {
                AppError::field("therapist_id", message)
            }
            AppointmentError::OutsideAvailability { .. } | AppointmentError::SlotTaken => {
                AppError::field("start_time", message)
            }
            AppointmentError::InvalidCancellationReason(_) => {
                AppError::field("cancellation_reason", message)
            }
            AppointmentError::InvalidMeetingLink => AppError::field("meeting_link", message),
            AppointmentError::InvalidRating => AppError::field("rating", message),

            AppointmentError::TherapistNotFound | AppointmentError::NotFound => AppError::NotFound(message),
            AppointmentError::Forbidden(_) => AppError::Forbidden(message),

            AppointmentError::AlreadyCancelled
            | AppointmentError::CancellationWindowClosed
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::StatusChanged
            | AppointmentError::FeedbackNotAllowed
            | AppointmentError::FeedbackAlreadySubmitted => AppError::BadRequest(message),

            AppointmentError::Database(msg) => AppError::Database(msg),
        }
    }
}
