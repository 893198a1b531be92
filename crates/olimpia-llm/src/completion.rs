//! Completion request and response types

use crate::Message;
use serde::{Deserialize, Serialize};

/// One generation call: model, conversation and sampling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,

    pub messages: Vec<Message>,

    /// System instruction, sent apart from the conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Output token cap
    pub max_tokens: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

/// Reply of a generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Assistant message carrying the generated text
    pub message: Message,

    pub stop_reason: StopReason,

    pub usage: TokenUsage,
}

/// Why the model stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Finished on its own or on a stop sequence
    EndTurn,

    /// Ran into `max_tokens`
    MaxTokens,

    /// Cut short by a safety or recitation filter
    Filtered,
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

impl CompletionRequest {
    pub fn builder(model: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new(model)
    }
}

/// Builder for [`CompletionRequest`]; `max_tokens` defaults to 2048
#[derive(Debug, Clone)]
pub struct CompletionRequestBuilder {
    request: CompletionRequest,
}

impl CompletionRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            request: CompletionRequest {
                model: model.into(),
                messages: Vec::new(),
                system: None,
                max_tokens: 2048,
                temperature: None,
                stop_sequences: None,
            },
        }
    }

    /// Append one message to the conversation
    pub fn add_message(mut self, message: Message) -> Self {
        self.request.messages.push(message);
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.request.system = Some(system.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.request.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.request.temperature = Some(temperature);
        self
    }

    pub fn stop_sequences(mut self, sequences: Vec<String>) -> Self {
        self.request.stop_sequences = Some(sequences);
        self
    }

    pub fn build(self) -> CompletionRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let request = CompletionRequest::builder("gemini-2.5-flash")
            .add_message(Message::user("Qual o ticker da Vale?"))
            .system("Answer with the ticker only")
            .max_tokens(16)
            .temperature(0.0)
            .build();

        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_tokens, 16);
        assert_eq!(request.temperature, Some(0.0));
        assert!(request.stop_sequences.is_none());
    }

    #[test]
    fn test_default_token_cap() {
        let request = CompletionRequest::builder("m").build();
        assert_eq!(request.max_tokens, 2048);
        assert!(request.system.is_none());
    }

    #[test]
    fn test_token_usage() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }
}
