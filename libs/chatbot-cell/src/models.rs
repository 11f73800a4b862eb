use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_llm::LlmError;
use shared_models::error::AppError;

/// Who said a line of the conversation. Anything other than `user` is
/// treated as the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    #[serde(other)]
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrisisCheckRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrisisAssessment {
    pub is_crisis: bool,
    pub helpline: Option<&'static str>,
    pub message: Option<&'static str>,
}

#[derive(Error, Debug)]
pub enum ChatbotError {
    #[error("Message is required")]
    MessageRequired,

    #[error(transparent)]
    Generation(#[from] LlmError),
}

impl From<ChatbotError> for AppError {
    fn from(e: ChatbotError) -> Self {
        match e {
            ChatbotError::MessageRequired => AppError::BadRequest(e.to_string()),
            ChatbotError::Generation(inner) => AppError::Internal(inner.to_string()),
        }
    }
}
