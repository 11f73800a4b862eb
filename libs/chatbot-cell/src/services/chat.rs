use tracing::{debug, error};

use shared_config::AppConfig;
use shared_llm::{GenerationOptions, LlmClient};

use crate::models::{ChatRole, ChatTurn, ChatbotError};

/// Earlier turns carried into each prompt.
pub const HISTORY_WINDOW: usize = 6;

pub const SYSTEM_PROMPT: &str = "You are a compassionate mental health support chatbot. Your role is to:
- Provide empathetic, supportive responses
- Keep responses concise (2-4 sentences maximum)
- Offer practical coping strategies when appropriate
- Encourage professional help for serious concerns
- Never diagnose or replace professional therapy
- Be warm, non-judgmental, and validating
- Ask clarifying questions when needed

Remember: You're here to support, not to cure. Always prioritize user safety.";

const ACKNOWLEDGEMENT: &str = "I understand. I will provide empathetic, concise mental health support.";

const CHAT_OPTIONS: GenerationOptions = GenerationOptions {
    temperature: 0.7,
    top_p: 0.95,
    max_tokens: 500,
};

fn speaker(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "User",
        ChatRole::Assistant => "Assistant",
    }
}

/// Flattens the system prompt, the last few turns and the new message into
/// a single completion prompt ending on the assistant's cue.
pub fn build_chat_prompt(history: &[ChatTurn], message: &str) -> String {
    let recent = &history[history.len().saturating_sub(HISTORY_WINDOW)..];

    let mut lines = vec![
        SYSTEM_PROMPT.to_string(),
        String::new(),
        format!("Assistant: {}", ACKNOWLEDGEMENT),
    ];
    lines.extend(
        recent
            .iter()
            .map(|turn| format!("{}: {}", speaker(turn.role), turn.content.trim())),
    );
    lines.push(format!("User: {}", message.trim()));
    lines.push("Assistant:".to_string());

    lines.join("\n")
}

pub struct ChatService {
    llm: LlmClient,
}

impl ChatService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            llm: LlmClient::new(config),
        }
    }

    pub async fn reply(&self, message: &str, history: &[ChatTurn]) -> Result<String, ChatbotError> {
        if message.trim().is_empty() {
            return Err(ChatbotError::MessageRequired);
        }

        debug!("Chat turn with {} prior messages", history.len());
        let prompt = build_chat_prompt(history, message);

        self.llm.generate_with(&prompt, CHAT_OPTIONS).await.map_err(|e| {
            error!("Chat reply generation failed: {}", e);
            ChatbotError::Generation(e)
        })
    }
}
