use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::SupabaseError;
use shared_models::error::AppError;

pub const MAX_TITLE_CHARS: usize = 255;
pub const DEFAULT_ANALYTICS_DAYS: i64 = 30;
pub const MAX_ANALYTICS_DAYS: i64 = 365;

// ==============================================================================
// ENTRIES
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Excited,
    Calm,
    Sad,
    Anxious,
    Angry,
    #[default]
    Neutral,
    Grateful,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Excited => "excited",
            Mood::Calm => "calm",
            Mood::Sad => "sad",
            Mood::Anxious => "anxious",
            Mood::Angry => "angry",
            Mood::Neutral => "neutral",
            Mood::Grateful => "grateful",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of `journal_entries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub mood: Mood,
    pub mood_intensity: i16,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The columns analytics needs; fetched with a narrow `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodSample {
    pub mood: Mood,
    pub mood_intensity: i16,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub title: String,
    pub content: String,
    pub mood: Option<Mood>,
    pub mood_intensity: Option<i16>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEntryRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub mood: Option<Mood>,
    pub mood_intensity: Option<i16>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EntryListQuery {
    pub mood: Option<Mood>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<i64>,
}

impl AnalyticsQuery {
    pub fn days(&self) -> Result<i64, JournalError> {
        match self.days {
            None => Ok(DEFAULT_ANALYTICS_DAYS),
            Some(days) if (1..=MAX_ANALYTICS_DAYS).contains(&days) => Ok(days),
            Some(_) => Err(JournalError::InvalidWindow),
        }
    }
}

// ==============================================================================
// ANALYTICS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodShare {
    pub mood: Mood,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub avg_intensity: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalSummary {
    pub total_entries: usize,
    pub average_intensity: f64,
    pub most_common_mood: Option<Mood>,
    pub entries_this_month: usize,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Journal entry not found")]
    NotFound,

    #[error("Title is required and must be at most 255 characters")]
    InvalidTitle,

    #[error("Content cannot be empty")]
    EmptyContent,

    #[error("Mood intensity must be between 1 and 10.")]
    InvalidIntensity,

    #[error("days must be between 1 and 365")]
    InvalidWindow,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<SupabaseError> for JournalError {
    fn from(e: SupabaseError) -> Self {
        JournalError::Database(e.to_string())
    }
}

impl From<JournalError> for AppError {
    fn from(e: JournalError) -> Self {
        let message = e.to_string();
        match e {
            JournalError::NotFound => AppError::NotFound(message),
            JournalError::InvalidTitle => AppError::field("title", message),
            JournalError::EmptyContent => AppError::field("content", message),
            JournalError::InvalidIntensity => AppError::field("mood_intensity", message),
            JournalError::InvalidWindow => AppError::field("days", message),
            JournalError::Database(msg) => AppError::Database(msg),
        }
    }
}
