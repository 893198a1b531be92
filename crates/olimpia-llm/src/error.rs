//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LLMError {
    /// API request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit or quota exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Response was blocked by the provider's safety filters
    #[error("Response blocked: {0}")]
    Blocked(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LLMError {
    /// Whether this error means the credential ran out of quota
    ///
    /// Besides the dedicated variant, some gateways report quota exhaustion
    /// with a generic failure whose body carries `429` or `RESOURCE_EXHAUSTED`.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            LLMError::RateLimitExceeded(_) => true,
            LLMError::RequestFailed(msg) | LLMError::UnexpectedResponse(msg) => {
                msg.contains("429") || msg.contains("RESOURCE_EXHAUSTED")
            }
            _ => false,
        }
    }
}
