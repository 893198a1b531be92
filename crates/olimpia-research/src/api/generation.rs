//! Text-generation capability

use crate::config::ResearchConfig;
use crate::error::GenerationError;
use async_trait::async_trait;
use olimpia_llm::providers::{GeminiConfig, GeminiProvider};
use olimpia_llm::{CompletionRequest, LLMProvider, Message};
use std::time::Duration;
use tracing::{debug, instrument};

/// One prompt in, one reply out, against an explicit credential
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, credential: &str) -> Result<String, GenerationError>;
}

/// Gemini-backed generator
///
/// A provider is bound to one key, so each call builds one for the credential
/// it was given.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    model: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
    api_base: Option<String>,
}

impl GeminiGenerator {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.1,
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
            api_base: None,
        }
    }

    /// Generator for `config.model`, bounded by `config.request_timeout`
    pub fn from_config(config: &ResearchConfig, temperature: f32) -> Self {
        Self::new(config.model.clone())
            .with_temperature(temperature)
            .with_timeout(config.request_timeout)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    fn provider_for(&self, credential: &str) -> Result<GeminiProvider, GenerationError> {
        let mut config = GeminiConfig::new(credential).with_timeout(self.timeout.as_secs().max(1));
        if let Some(base) = &self.api_base {
            config = config.with_api_base(base.clone());
        }
        Ok(GeminiProvider::with_config(config)?)
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    #[instrument(skip(self, prompt, credential), fields(model = %self.model))]
    async fn generate(&self, prompt: &str, credential: &str) -> Result<String, GenerationError> {
        let provider = self.provider_for(credential)?;
        let request = CompletionRequest::builder(self.model.clone())
            .add_message(Message::user(prompt))
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build();

        let response = provider.complete(request).await?;
        debug!(tokens = response.usage.total(), "Generation done");

        response
            .message
            .text()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| GenerationError::Fatal("empty completion".to_string()))
    }
}
