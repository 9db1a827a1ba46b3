//! Client for the hosted text-generation service.
//!
//! Talks to an OpenAI-compatible `chat/completions` endpoint (Groq by
//! default). A call either yields the top choice's text or a typed
//! [`GenerationError`]; provider messages are passed through untouched.
//! Transport failures, timeouts and 5xx responses are retried a bounded
//! number of times with exponential backoff. Everything else fails at once.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::prompt::GenerationRequest;
use crate::config::GeneratorConfig;

/// Longest pause between two attempts, however many retries are allowed.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("could not reach the generation service: {0}")]
    Transport(String),
    #[error("the generation service did not answer in time")]
    Timeout,
    #[error("the generation service rejected the credential: {0}")]
    Unauthorized(String),
    #[error("the generation service quota is exhausted: {0}")]
    QuotaExceeded(String),
    #[error("the generation service failed (HTTP {status}): {message}")]
    Provider { status: u16, message: String },
    #[error("the generation service returned an unusable response: {0}")]
    Malformed(String),
}

impl GenerationError {
    fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Transport(_) | GenerationError::Timeout => true,
            GenerationError::Provider { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

impl<'a> From<&'a GenerationRequest> for ChatCompletionBody<'a> {
    fn from(req: &'a GenerationRequest) -> Self {
        Self {
            model: &req.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &req.system_role,
                },
                ChatMessage {
                    role: "user",
                    content: &req.user_text,
                },
            ],
            max_tokens: req.max_output_tokens,
            temperature: req.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    backoff: Duration,
    timeout: Duration,
}

impl ChatCompletionsClient {
    pub fn new(cfg: &GeneratorConfig) -> anyhow::Result<Self> {
        let cfg = cfg.clone().checked()?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key,
            max_retries: cfg.max_retries,
            backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(cfg.timeout_secs),
        })
    }

    /// Per-attempt deadline covering connect, send and reading the body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base delay between retries; doubled after each attempt.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn send_once(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&ChatCompletionBody::from(request))
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProviderErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| {
                    if body.trim().is_empty() {
                        status.to_string()
                    } else {
                        body.clone()
                    }
                });
            return Err(match status.as_u16() {
                401 | 403 => GenerationError::Unauthorized(message),
                429 => GenerationError::QuotaExceeded(message),
                code => GenerationError::Provider {
                    status: code,
                    message,
                },
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::Malformed("response contained no plan text".into()))
    }
}

fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(2u32.saturating_pow(attempt))
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF)
}

fn classify_transport(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Transport(e.to_string())
    }
}

#[async_trait]
impl PlanGenerator for ChatCompletionsClient {
    #[tracing::instrument(skip_all, fields(model = %request.model))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let mut attempt = 0;
        loop {
            match self.send_once(request).await {
                Ok(text) => {
                    tracing::debug!(attempt, chars = text.len(), "plan generated");
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = retry_delay(self.backoff, attempt);
                    tracing::warn!(error = %e, attempt, ?delay, "generation failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "generation failed");
                    return Err(e);
                }
            }
        }
    }
}
