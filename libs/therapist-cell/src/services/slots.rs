use chrono::{Datelike, Duration, NaiveDateTime};

use crate::models::{BookedInterval, DayOfWeek, Slot, TherapistAvailability, TimeOffPeriod};
use crate::services::schedule::{resolve_day_windows, TimeRange, WeeklySchedule};

pub const SLOT_MINUTES: i64 = 60;
pub const HORIZON_DAYS: i64 = 30;

/// Everything the resolver needs about one therapist.
pub struct AvailabilitySources<'a> {
    pub schedule: &'a WeeklySchedule,
    pub rules: &'a [TherapistAvailability],
    pub time_off: &'a [TimeOffPeriod],
    pub booked: &'a [BookedInterval],
}

/// Consecutive slots of `length` that fit entirely inside `window`.
pub fn partition_window(window: TimeRange, length: Duration) -> Vec<TimeRange> {
    let mut slots = Vec::new();
    if length <= Duration::zero() {
        return slots;
    }

    let mut current = window.start;
    loop {
        let (end, wrapped) = current.overflowing_add_signed(length);
        if wrapped != 0 || end > window.end {
            break;
        }
        slots.push(TimeRange { start: current, end });
        current = end;
    }
    slots
}

/// Candidate slots for `[today, today + HORIZON_DAYS]`, where `today` is the
/// UTC date of `now`. Output is ordered by date then start time.
pub fn resolve_slots(sources: &AvailabilitySources<'_>, now: NaiveDateTime) -> Vec<Slot> {
    let today = now.date();
    let length = Duration::minutes(SLOT_MINUTES);
    let mut slots = Vec::new();

    for offset in 0..=HORIZON_DAYS {
        let date = today + Duration::days(offset);

        if sources.time_off.iter().any(|period| period.covers(date)) {
            continue;
        }

        let day = DayOfWeek::from(date.weekday());
        for window in resolve_day_windows(sources.schedule, sources.rules, day) {
            for range in partition_window(window, length) {
                let taken = sources
                    .booked
                    .iter()
                    .any(|booking| booking.overlaps(date, range.start, range.end));
                let in_past = date.and_time(range.start) < now;

                slots.push(Slot {
                    date,
                    start_time: range.start,
                    end_time: range.end,
                    is_available: !taken && !in_past,
                });
            }
        }
    }

    slots.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
    slots
}
