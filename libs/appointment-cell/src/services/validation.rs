use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use tracing::debug;

use shared_models::auth::Role;
use therapist_cell::models::{
    BookedInterval, DayOfWeek, TherapistAvailability, TherapistProfile, TimeOffPeriod, UserAccount,
};
use therapist_cell::services::schedule::{resolve_day_windows, WeeklySchedule};

use crate::error::AppointmentError;
use crate::models::CreateAppointmentRequest;

pub const DEFAULT_DURATION_MINUTES: i64 = 60;
pub const MIN_DURATION_MINUTES: i64 = 15;
pub const MAX_DURATION_MINUTES: i64 = 240;

const PHONE_PATTERN: &str = r"^\+?1?\d{9,15}$";

/// The concrete interval a booking request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedSlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
}

/// Everything the availability checks look at, loaded up front.
pub struct BookingContext<'a> {
    pub therapist: Option<&'a UserAccount>,
    pub profile: Option<&'a TherapistProfile>,
    pub rules: &'a [TherapistAvailability],
    pub time_off: &'a [TimeOffPeriod],
    pub booked: &'a [BookedInterval],
}

/// Request-only checks: the date must not be in the past, the duration must
/// fit in the day, and the contact phone (when given) must look like a number.
pub fn validate_request(
    request: &CreateAppointmentRequest,
    now: NaiveDateTime,
) -> Result<RequestedSlot, AppointmentError> {
    let today = now.date();
    if request.appointment_date < today
        || (request.appointment_date == today && request.start_time < now.time())
    {
        return Err(AppointmentError::AppointmentInPast);
    }

    let (end_time, duration_minutes) = resolve_end_time(request)?;

    if let Some(phone) = request.contact_phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        if !is_valid_phone(phone) {
            return Err(AppointmentError::InvalidContactPhone);
        }
    }

    Ok(RequestedSlot {
        date: request.appointment_date,
        start_time: request.start_time,
        end_time,
        duration_minutes,
    })
}

fn resolve_end_time(request: &CreateAppointmentRequest) -> Result<(NaiveTime, i64), AppointmentError> {
    let (end_time, duration) = match request.end_time {
        Some(end_time) => {
            if end_time <= request.start_time {
                return Err(AppointmentError::InvalidDuration(
                    "End time must be after start time".to_string(),
                ));
            }
            (end_time, (end_time - request.start_time).num_minutes())
        }
        None => {
            let duration = request.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
            if duration <= 0 {
                return Err(duration_out_of_range());
            }
            let (end_time, wrapped) = request
                .start_time
                .overflowing_add_signed(Duration::minutes(duration));
            if wrapped != 0 {
                return Err(AppointmentError::InvalidDuration(
                    "Appointment must end on the same day".to_string(),
                ));
            }
            (end_time, duration)
        }
    };

    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration) {
        return Err(duration_out_of_range());
    }

    Ok((end_time, duration))
}

fn duration_out_of_range() -> AppointmentError {
    AppointmentError::InvalidDuration(format!(
        "Duration must be between {} and {} minutes",
        MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
    ))
}

pub fn is_valid_phone(phone: &str) -> bool {
    Regex::new(PHONE_PATTERN)
        .map(|re| re.is_match(phone))
        .unwrap_or(false)
}

/// Therapist-side checks, in order: the therapist exists with a profile, the
/// slot sits inside one availability window for that weekday, the day is not
/// covered by time off, and no pending or confirmed booking overlaps.
pub fn validate_booking(slot: &RequestedSlot, context: &BookingContext<'_>) -> Result<(), AppointmentError> {
    let therapist = context.therapist.ok_or(AppointmentError::TherapistNotFound)?;
    if therapist.role != Role::Therapist {
        return Err(AppointmentError::NotATherapist);
    }
    let profile = context.profile.ok_or(AppointmentError::TherapistProfileMissing)?;

    let day = DayOfWeek::from(slot.date.weekday());
    let schedule = WeeklySchedule::from_json(&profile.availability_slots);
    let windows = resolve_day_windows(&schedule, context.rules, day);
    if !windows.iter().any(|w| w.contains(slot.start_time, slot.end_time)) {
        debug!("{}-{} on {} falls outside {} window(s)", slot.start_time, slot.end_time, day, windows.len());
        return Err(AppointmentError::OutsideAvailability { day: day.display_name() });
    }

    if context.time_off.iter().any(|period| period.covers(slot.date)) {
        return Err(AppointmentError::TherapistOnLeave);
    }

    if context
        .booked
        .iter()
        .any(|interval| interval.overlaps(slot.date, slot.start_time, slot.end_time))
    {
        return Err(AppointmentError::SlotTaken);
    }

    Ok(())
}
