// Application configuration loaded from the environment

use std::{env, fmt::Display, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::info;

const DEFAULT_AI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration errors raised at start-up
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Text-generation provider settings
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Transactional email provider settings
///
/// Every field is optional so the server can start without mail credentials;
/// sends fail at send time when any of them is missing.
#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: Option<String>,
}

/// Notification worker settings
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub max_attempts: i32,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 20,
            max_attempts: 3,
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub auth_jwt_secret: String,
    pub ai: AiConfig,
    pub mail: MailConfig,
    pub notify: NotifyConfig,
    pub seed_demo: bool,
}

impl AppConfig {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", 8080)?,
            auth_jwt_secret: required("AUTH_JWT_SECRET")?,
            ai: AiConfig {
                api_key: optional("AI_API_KEY"),
                model: optional("AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
                base_url: optional("AI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_AI_BASE_URL.to_string()),
                timeout: Duration::from_secs(parse_or("AI_TIMEOUT_SECS", 30)?),
            },
            mail: MailConfig {
                api_url: optional("MAIL_API_URL"),
                api_key: optional("MAIL_API_KEY"),
                from: optional("MAIL_FROM"),
            },
            notify: NotifyConfig {
                poll_interval: Duration::from_secs(parse_or("NOTIFY_POLL_INTERVAL_SECS", 5)?),
                batch_size: parse_or("NOTIFY_BATCH_SIZE", 20)?,
                max_attempts: parse_or("NOTIFY_MAX_ATTEMPTS", 3)?,
            },
            seed_demo: parse_or("SEED_DEMO", false)?,
        })
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(key) {
        Some(raw) => parse_value(key, &raw),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}
