use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use shared_database::SupabaseError;
use shared_models::error::AppError;

// ==============================================================================
// SURVEY
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Survey {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub status: SurveyStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub analysis_summary: Option<String>,
    pub risk_level: Option<RiskLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    /// Exact label match after trimming and lowercasing; anything else is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveyAnalysis {
    pub summary: String,
    pub risk_level: RiskLevel,
}

// ==============================================================================
// QUESTIONS AND ANSWERS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    SingleChoice,
    MultipleChoice,
    Scale,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub response_type: ResponseType,
    #[serde(alias = "display_order")]
    pub order: i32,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// Stored static answer with the question it belongs to embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub question_id: Uuid,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub question: Option<EmbeddedQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(alias = "display_order")]
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicQuestionHistory {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub question_text: String,
    pub answer: String,
    #[serde(default, skip_serializing)]
    pub context_used: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A question/answer pair as fed to the generation prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurveyIdRequest {
    pub survey_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticResponsesRequest {
    pub survey_id: Option<Uuid>,
    #[serde(default)]
    pub responses: Vec<StaticAnswer>,
}

/// `answer` may be a string, a number (scale) or an array (multiple choice).
#[derive(Debug, Clone, Deserialize)]
pub struct StaticAnswer {
    pub question_id: Uuid,
    pub answer: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DynamicAnswerRequest {
    pub survey_id: Option<Uuid>,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub answer: String,
}

// ==============================================================================
// RESPONSES
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SavedAnswer {
    pub question_id: Uuid,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynamicQuestionOutcome {
    Question { question_text: String, question_number: usize },
    LimitReached,
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyListEntry {
    #[serde(flatten)]
    pub survey: Survey,
    pub total_responses: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyDetail {
    #[serde(flatten)]
    pub survey: Survey,
    pub responses: Vec<SurveyResponse>,
    pub dynamic_questions: Vec<DynamicQuestionHistory>,
    pub total_responses: usize,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("survey_id is required")]
    MissingSurveyId,

    #[error("responses are required")]
    MissingResponses,

    #[error("Survey not found")]
    NotFound,

    #[error("Survey is already completed")]
    AlreadyCompleted,

    #[error("Some responses could not be saved")]
    InvalidAnswers(BTreeMap<String, String>),

    #[error("question_text is required")]
    QuestionTextRequired,

    #[error("Answer cannot be empty")]
    AnswerRequired,

    #[error("Maximum dynamic questions reached")]
    DynamicLimitReached,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<SupabaseError> for SurveyError {
    fn from(e: SupabaseError) -> Self {
        SurveyError::Database(e.to_string())
    }
}

impl From<SurveyError> for AppError {
    fn from(e: SurveyError) -> Self {
        match e {
            SurveyError::NotFound => AppError::NotFound(e.to_string()),
            SurveyError::InvalidAnswers(fields) => AppError::FieldErrors(fields),
            SurveyError::QuestionTextRequired => AppError::field("question_text", e.to_string()),
            SurveyError::AnswerRequired => AppError::field("answer", e.to_string()),
            SurveyError::Database(msg) => AppError::Database(msg),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}
