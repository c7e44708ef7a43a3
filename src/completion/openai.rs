//! OpenAI-compatible chat completion client (OpenAI, OpenRouter, local servers)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::retry::{self, RetryPolicy};
use super::CompletionService;
use crate::context::Exchange;
use crate::{Error, Result};

/// Connection settings for the completion endpoint
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// API base URL, e.g. `https://openrouter.ai/api/v1`
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Reply length cap
    pub max_tokens: u32,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry behaviour for transient failures
    pub retry: RetryPolicy,
}

/// Chat completion client speaking the OpenAI wire format
pub struct OpenAiCompatible {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl OpenAiCompatible {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the HTTP client cannot be built
    pub fn new(config: CompletionConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config(
                "API key required for chat completions (OPENROUTER_API_KEY)".to_string(),
            ));
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        tracing::debug!(endpoint, model = %config.model, "completion client initialized");

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            model: config.model,
            max_tokens: config.max_tokens,
            retry: config.retry,
        })
    }

    /// Send one request, returning the reply or whether the failure is retryable
    async fn send_once(
        &self,
        request: &ChatCompletionRequest<'_>,
    ) -> std::result::Result<String, Failure> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| Failure {
                retryable: e.is_timeout() || e.is_connect(),
                retry_after: None,
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(retry::parse_retry_after);
            let body = response.text().await.unwrap_or_default();
            return Err(Failure {
                retryable: retry::is_recoverable(status.as_u16()),
                retry_after,
                message: format!("API error {status}: {body}"),
            });
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| Failure {
            retryable: false,
            retry_after: None,
            message: format!("failed to parse response: {e}"),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Failure {
                retryable: false,
                retry_after: None,
                message: "response contained no reply".to_string(),
            })
    }
}

#[async_trait]
impl CompletionService for OpenAiCompatible {
    async fn complete(&self, system_prompt: &str, messages: &[Exchange]) -> Result<String> {
        let request = ChatCompletionRequest::new(&self.model, self.max_tokens, system_prompt, messages);

        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Ok(reply) => {
                    tracing::debug!(reply_len = reply.len(), attempt, "completion received");
                    return Ok(reply);
                }
                Err(failure) if failure.retryable && attempt < self.retry.max_retries => {
                    let delay = retry::delay_for_attempt(&self.retry, attempt, failure.retry_after);
                    tracing::warn!(
                        error = %failure.message,
                        attempt,
                        delay_ms = delay.as_millis(),
                        "completion failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) => {
                    tracing::error!(error = %failure.message, attempt, "completion failed");
                    return Err(Error::Completion(failure.message));
                }
            }
        }
    }
}

struct Failure {
    retryable: bool,
    retry_after: Option<Duration>,
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn new(model: &'a str, max_tokens: u32, system_prompt: &'a str, history: &'a [Exchange]) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: system_prompt,
        });
        messages.extend(history.iter().map(|e| WireMessage {
            role: e.role().as_str(),
            content: e.content(),
        }));

        Self {
            model,
            messages,
            max_tokens: (max_tokens > 0).then_some(max_tokens),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
