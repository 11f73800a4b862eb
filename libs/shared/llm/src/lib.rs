//! Thin client for the text-generation backend (Ollama `/api/generate` wire
//! format). Used by the survey flow and the support chatbot.

use std::time::Duration;

use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Text generation backend is not configured")]
    NotConfigured,

    #[error("Text generation timed out")]
    Timeout,

    #[error("Text generation request failed: {0}")]
    Transport(reqwest::Error),

    #[error("Text generation backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Text generation backend returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Transport(e)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    #[serde(rename = "num_predict")]
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 100,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerationOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Clone)]
pub struct LlmClient {
    http_client: Client,
    api_url: String,
    model: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http_client: Client::new(),
            api_url: config.llm_api_url.clone(),
            model: config.llm_model.clone(),
            timeout: Duration::from_secs(config.llm_timeout_secs.max(1)),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate_with(prompt, GenerationOptions::default()).await
    }

    /// Single blocking generation; no retries. Whitespace-only output is an error.
    pub async fn generate_with(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String, LlmError> {
        if self.api_url.is_empty() || self.model.is_empty() {
            return Err(LlmError::NotConfigured);
        }

        debug!("Requesting generation from {} ({} prompt chars)", self.api_url, prompt.len());

        let payload = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options,
        };

        let response = self.http_client.post(&self.api_url)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Text generation backend error ({}): {}", status, body);
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let generated: GenerateResponse = response.json().await?;
        let text = generated.response.trim();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(text.to_string())
    }
}
