//! OpenAI-compatible generator implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use tracing::{debug, warn};

use pagecase_protocols::error::GenerationError;
use pagecase_protocols::generator::{GenerationRequest, TextGenerator};

use crate::api::{error_message, ApiMessage, ApiRequest, ApiResponse};

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Text generator backed by a chat-completions endpoint.
pub struct OpenAIGenerator {
    api_key: String,
    api_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    pub fn new(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Self::with_url(api_key, DEFAULT_API_URL, DEFAULT_TIMEOUT)
    }

    /// Create a generator for a custom endpoint (for OpenAI-compatible APIs).
    pub fn with_url(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
            timeout,
            client,
        })
    }

    fn build_request(&self, request: &GenerationRequest) -> ApiRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ApiMessage::system(system.as_str()));
        }
        messages.push(ApiMessage::user(request.prompt.as_str()));

        ApiRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    async fn send_request(&self, api_request: &ApiRequest) -> Result<reqwest::Response, GenerationError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(api_request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::from_status(status, error_message(&text), retry_after));
        }

        Ok(response)
    }

    fn transport_error(&self, error: reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            GenerationError::Timeout(self.timeout.as_secs())
        } else {
            GenerationError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    fn id(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let api_request = self.build_request(&request);
        debug!(
            model = %api_request.model,
            max_tokens = ?api_request.max_tokens,
            "Sending chat completion request"
        );

        let response = self.send_request(&api_request).await?;
        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        if let Some(choice) = api_response.choices.first() {
            if choice.finish_reason.as_deref() == Some("length") {
                warn!(
                    model = api_response.model.as_deref().unwrap_or(&api_request.model),
                    "Completion stopped at the token limit, reply may be truncated"
                );
            }
        }

        api_response.into_text().ok_or_else(|| GenerationError::Upstream {
            status: None,
            message: "response contained no message content".to_string(),
        })
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
