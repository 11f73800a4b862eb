use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveTime;
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{DayOfWeek, TherapistAvailability};

/// Strict interval overlap: touching endpoints do not overlap.
pub fn intervals_overlap(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && a_end > b_start
}

/// Half-open wall-clock window `[start, end)` within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Parses `"HH:MM - HH:MM"`; seconds and missing spaces are tolerated.
    pub fn parse(raw: &str) -> Option<Self> {
        let (start, end) = raw.split_once('-')?;
        Self::new(parse_clock(start)?, parse_clock(end)?)
    }

    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start <= start && end <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Typed form of the profile's per-day JSON schedule.
///
/// Only days with at least one usable range are kept, so a day that is
/// missing, empty or entirely malformed reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklySchedule {
    days: BTreeMap<DayOfWeek, Vec<TimeRange>>,
}

impl WeeklySchedule {
    pub fn from_json(value: &Value) -> Self {
        let object = match value {
            Value::Object(map) => map.clone(),
            // Some clients store the schedule as a JSON-encoded string.
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                _ => return Self::default(),
            },
            _ => return Self::default(),
        };

        let mut days = BTreeMap::new();
        for (key, ranges) in &object {
            let Some(day) = DayOfWeek::from_name(key) else {
                debug!("Ignoring unknown schedule key '{}'", key);
                continue;
            };

            let mut parsed: Vec<TimeRange> = match ranges {
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(TimeRange::parse)
                    .collect(),
                Value::String(single) => TimeRange::parse(single).into_iter().collect(),
                _ => Vec::new(),
            };

            if parsed.is_empty() {
                continue;
            }
            parsed.sort();
            days.entry(day).or_insert_with(Vec::new).extend(parsed);
        }

        for ranges in days.values_mut() {
            ranges.sort();
        }

        Self { days }
    }

    pub fn windows(&self, day: DayOfWeek) -> &[TimeRange] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (day, ranges) in &self.days {
            map.insert(
                day.display_name().to_string(),
                Value::Array(ranges.iter().map(|r| Value::String(r.to_string())).collect()),
            );
        }
        Value::Object(map)
    }
}

/// Availability windows for one weekday.
///
/// The profile schedule is authoritative for any day it defines; active
/// relational rules are only used for days the schedule leaves out.
pub fn resolve_day_windows(
    schedule: &WeeklySchedule,
    rules: &[TherapistAvailability],
    day: DayOfWeek,
) -> Vec<TimeRange> {
    let from_schedule = schedule.windows(day);
    if !from_schedule.is_empty() {
        return from_schedule.to_vec();
    }

    let mut windows: Vec<TimeRange> = rules
        .iter()
        .filter(|rule| rule.is_active && rule.day_of_week == day)
        .filter_map(|rule| TimeRange::new(rule.start_time, rule.end_time))
        .collect();
    windows.sort();
    windows
}
