// Outbound email port and its HTTP adapter

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;

use crate::config::MailConfig;
use crate::notifications::models::EmailMessage;

const MAIL_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport is not configured: missing {0}")]
    MissingCredentials(&'static str),

    #[error("Mail request failed: {0}")]
    Transport(String),

    #[error("Mail provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Port for sending one email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Transactional-email HTTP API adapter
///
/// Posts `{from, to, subject, text}` as JSON with a bearer key. Missing
/// settings are only reported when a send is attempted.
pub struct HttpMailer {
    client: Client,
    config: MailConfig,
}

impl HttpMailer {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: MailConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(MAIL_REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let url = self
            .config
            .api_url
            .as_deref()
            .ok_or(MailError::MissingCredentials("MAIL_API_URL"))?;
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or(MailError::MissingCredentials("MAIL_API_KEY"))?;
        let from = self
            .config
            .from
            .as_deref()
            .ok_or(MailError::MissingCredentials("MAIL_FROM"))?;

        let response = self
            .client
            .post(url)
            .bearer_auth(key)
            .json(&json!({
                "from": from,
                "to": message.to,
                "subject": message.subject,
                "text": message.text,
            }))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Mailer that records messages instead of sending them
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    pub fail: bool,
    pub sent: std::sync::Mutex<Vec<EmailMessage>>,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
