//! Google Gemini provider implementation
//!
//! This module implements the LLMProvider trait for Gemini models through the
//! `generateContent` endpoint.
//! See: https://ai.google.dev/api/generate-content
//!
//! # Example
//!
//! ```no_run
//! use olimpia_llm::{CompletionRequest, LLMProvider, Message};
//! use olimpia_llm::providers::{GeminiConfig, GeminiProvider};
//!
//! # async fn run() -> olimpia_llm::Result<()> {
//! let provider = GeminiProvider::with_config(GeminiConfig::new("AIza...").with_timeout(60))?;
//!
//! let request = CompletionRequest::builder("gemini-2.5-flash")
//!     .add_message(Message::user("Qual o ticker da Ambev na B3?"))
//!     .temperature(0.0)
//!     .build();
//!
//! let response = provider.complete(request).await?;
//! println!("{}", response.message.content);
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, Result, Role,
    StopReason, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the API (default: "https://generativelanguage.googleapis.com/v1beta")
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create config from environment variable
    ///
    /// Reads `GEMINI_API_KEY`. The variable may hold several comma-separated
    /// keys; the first non-empty one is used.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var("GEMINI_API_KEY").map_err(|_| {
            LLMError::ConfigurationError("GEMINI_API_KEY environment variable not set".to_string())
        })?;

        let api_key = raw
            .split(',')
            .map(str::trim)
            .find(|k| !k.is_empty())
            .ok_or_else(|| {
                LLMError::ConfigurationError("GEMINI_API_KEY holds no usable key".to_string())
            })?;

        Ok(Self::new(api_key))
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Same settings, different credential
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// Gemini provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider with custom configuration
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a new Gemini provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(GeminiConfig::new(api_key))
    }

    /// Create a provider from environment variable
    pub fn from_env() -> Result<Self> {
        Self::with_config(GeminiConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to Gemini API");

        let model = request.model.clone();
        let gemini_request = build_request(request);

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.config.api_base, model
            ))
            .header("x-goog-api-key", &self.config.api_key)
            .header("content-type", "application/json")
            .json(&gemini_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await?;
            return Err(classify_error(status, error_text, model));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        parse_response(gemini_response)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Map an HTTP failure onto the error taxonomy
fn classify_error(status: u16, body: String, model: String) -> LLMError {
    match status {
        401 | 403 => LLMError::AuthenticationFailed,
        429 => LLMError::RateLimitExceeded(body),
        400 => LLMError::InvalidRequest(body),
        404 => LLMError::ModelNotFound(model),
        _ if body.contains("RESOURCE_EXHAUSTED") => LLMError::RateLimitExceeded(body),
        _ => LLMError::RequestFailed(format!("HTTP {status}: {body}")),
    }
}

fn build_request(request: CompletionRequest) -> GeminiRequest {
    let mut system_parts: Vec<GeminiPart> = request
        .system
        .into_iter()
        .map(|text| GeminiPart { text })
        .collect();

    let mut contents = Vec::with_capacity(request.messages.len());
    for msg in request.messages {
        match msg.role {
            Role::System => system_parts.push(GeminiPart { text: msg.content }),
            Role::User => contents.push(GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: msg.content }],
            }),
            Role::Assistant => contents.push(GeminiContent {
                role: Some("model".to_string()),
                parts: vec![GeminiPart { text: msg.content }],
            }),
        }
    }

    GeminiRequest {
        contents,
        system_instruction: if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: system_parts,
            })
        },
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
            stop_sequences: request.stop_sequences,
        },
    }
}

fn parse_response(response: GeminiResponse) -> Result<CompletionResponse> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_ref())
    {
        return Err(LLMError::Blocked(reason.clone()));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LLMError::UnexpectedResponse("No candidates in response".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    let finish_reason = candidate.finish_reason.unwrap_or_default();
    debug!("Received response - finish_reason: {}", finish_reason);

    let usage = response
        .usage_metadata
        .map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        message: Message::assistant(text),
        stop_reason: map_finish_reason(&finish_reason),
        usage,
    })
}

fn map_finish_reason(reason: &str) -> StopReason {
    match reason {
        "MAX_TOKENS" => StopReason::MaxTokens,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => StopReason::Filtered,
        "STOP" | "" => StopReason::EndTurn,
        other => {
            debug!("Unknown finish reason: {}", other);
            StopReason::EndTurn
        }
    }
}

// Gemini-specific request/response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_output_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
