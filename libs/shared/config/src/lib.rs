use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_LLM_API_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_LLM_MODEL: &str = "llama2";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_DYNAMIC_QUESTIONS: usize = 5;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub llm_api_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub max_dynamic_questions: usize,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            llm_api_url: env::var("LLM_API_URL")
                .unwrap_or_else(|_| {
                    warn!("LLM_API_URL not set, using default");
                    DEFAULT_LLM_API_URL.to_string()
                }),
            llm_model: env::var("LLM_MODEL_NAME")
                .unwrap_or_else(|_| {
                    warn!("LLM_MODEL_NAME not set, using default");
                    DEFAULT_LLM_MODEL.to_string()
                }),
            llm_timeout_secs: parse_or_default("LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS),
            max_dynamic_questions: parse_or_default("MAX_DYNAMIC_QUESTIONS", DEFAULT_MAX_DYNAMIC_QUESTIONS),
            email_api_url: env::var("EMAIL_API_URL")
                .unwrap_or_else(|_| {
                    warn!("EMAIL_API_URL not set, cancellation notices will only be logged");
                    String::new()
                }),
            email_api_key: env::var("EMAIL_API_KEY").unwrap_or_default(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "no-reply@mindcare.local".to_string()),
            server_port: parse_or_default("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_llm_configured(&self) -> bool {
        !self.llm_api_url.is_empty() && !self.llm_model.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.email_api_url.is_empty() && !self.email_api_key.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", key, default);
            default
        }
    }
}
