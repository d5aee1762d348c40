//! Text-generation service protocol.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// One stateless completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier.
    pub model: String,

    /// System instruction, sent separately when the service supports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// User prompt.
    pub prompt: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: prompt.into(),
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A text-generation service. Each call is independent: no conversation
/// state is kept between calls.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the generator ID.
    fn id(&self) -> &str;

    /// Generate raw text for a prompt.
    async fn complete(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}
