// Text-generation port and its Gemini adapter
//
// The adapter only owns transport: request shape, timeout, status mapping
// and decoding the candidate text. Callers decide what a usable answer is.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::error::ApiError;

/// Generated copy shorter than this is treated as absent
pub const MIN_USABLE_TEXT_CHARS: usize = 20;

const EMAIL_TEMPERATURE: f64 = 0.7;
const EMAIL_MAX_OUTPUT_TOKENS: u32 = 1024;
const JSON_TEMPERATURE: f64 = 0.2;
const TRUNCATED_FINISH_REASON: &str = "MAX_TOKENS";

/// Failures of the text-generation collaborator
#[derive(Debug, Error)]
pub enum TextGenerationError {
    #[error("Text generation API key is not configured")]
    MissingApiKey,

    #[error("Text generation request failed: {0}")]
    Transport(String),

    #[error("Text generation returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected text generation response: {0}")]
    Decode(String),
}

impl From<TextGenerationError> for ApiError {
    fn from(error: TextGenerationError) -> Self {
        ApiError::Upstream(error.to_string())
    }
}

/// Port for the external text-generation service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short free-text copy; `Ok(None)` when the answer is truncated or too short
    async fn generate_text(&self, prompt: &str) -> Result<Option<String>, TextGenerationError>;

    /// A JSON document; anything that does not parse is an error
    async fn generate_json(&self, prompt: &str) -> Result<Value, TextGenerationError>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    fn first_text(&self) -> Option<&str> {
        self.first_candidate()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// Usable email copy from a raw response body
fn usable_text(response: &GenerateContentResponse) -> Option<String> {
    let candidate = response.first_candidate()?;
    if candidate.finish_reason.as_deref() == Some(TRUNCATED_FINISH_REASON) {
        debug!("Discarding truncated text generation output");
        return None;
    }
    let text = response.first_text()?.trim();
    (text.chars().count() >= MIN_USABLE_TEXT_CHARS).then(|| text.to_string())
}

fn parse_json_document(response: &GenerateContentResponse) -> Result<Value, TextGenerationError> {
    let text = response
        .first_text()
        .ok_or_else(|| TextGenerationError::Decode("missing candidate text".to_string()))?;
    serde_json::from_str(text)
        .map_err(|e| TextGenerationError::Decode(format!("invalid JSON document: {e}")))
}

/// Gemini `generateContent` adapter
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl GeminiClient {
    /// Build a client with the configured request timeout
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: &AiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
        })
    }

    async fn generate(
        &self,
        prompt: &str,
        generation_config: Value,
    ) -> Result<GenerateContentResponse, TextGenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(TextGenerationError::MissingApiKey)?;

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TextGenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TextGenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| TextGenerationError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<Option<String>, TextGenerationError> {
        let response = self
            .generate(
                prompt,
                json!({
                    "temperature": EMAIL_TEMPERATURE,
                    "maxOutputTokens": EMAIL_MAX_OUTPUT_TOKENS,
                    "thinkingConfig": { "thinkingBudget": 0 },
                }),
            )
            .await?;
        Ok(usable_text(&response))
    }

    async fn generate_json(&self, prompt: &str) -> Result<Value, TextGenerationError> {
        let response = self
            .generate(
                prompt,
                json!({
                    "temperature": JSON_TEMPERATURE,
                    "responseMimeType": "application/json",
                }),
            )
            .await?;
        let document = parse_json_document(&response);
        if let Err(e) = &document {
            warn!("Text generation returned an unusable JSON document: {}", e);
        }
        document
    }
}

/// Canned generator for tests
#[cfg(test)]
pub struct StubTextGenerator {
    pub text: Option<String>,
    pub json: Option<Value>,
}

#[cfg(test)]
#[async_trait]
impl TextGenerator for StubTextGenerator {
    async fn generate_text(&self, _prompt: &str) -> Result<Option<String>, TextGenerationError> {
        Ok(self.text.clone())
    }

    async fn generate_json(&self, _prompt: &str) -> Result<Value, TextGenerationError> {
        self.json
            .clone()
            .ok_or_else(|| TextGenerationError::Transport("stub has no JSON".to_string()))
    }
}
