//! Error types for the research pipeline
//!
//! Stage operations never surface these: each stage degrades to a placeholder
//! and logs the cause. They flow between adapters and stage internals, and out
//! of [`crate::ResearchConfig::validate`] before a run starts.

use thiserror::Error;

/// Research pipeline errors
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Search backend failed or returned something unparseable
    #[error("Search error: {0}")]
    Search(String),

    /// Market-data feed failed
    #[error("Market data error for {symbol}: {reason}")]
    MarketData { symbol: String, reason: String },

    /// Text generation failed
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Top-level misconfiguration, detected before the pipeline starts
    #[error("Configuration error: {0}")]
    Config(String),

    /// Template lookup or rendering failed
    #[error("Prompt error: {0}")]
    Prompt(#[from] olimpia_prompt::PromptError),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ResearchError {
    pub(crate) fn market(symbol: &str, reason: impl ToString) -> Self {
        Self::MarketData {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for research operations
pub type Result<T> = std::result::Result<T, ResearchError>;

/// Outcome of one generation call that did not produce text
///
/// Quota exhaustion is told apart from every other failure because it moves
/// key rotation on to the next credential, while anything else stops it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Generation quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Generation failed: {0}")]
    Fatal(String),
}

impl GenerationError {
    pub fn is_quota(&self) -> bool {
        matches!(self, GenerationError::QuotaExceeded(_))
    }
}

impl From<olimpia_llm::LLMError> for GenerationError {
    fn from(err: olimpia_llm::LLMError) -> Self {
        if err.is_rate_limited() {
            GenerationError::QuotaExceeded(err.to_string())
        } else {
            GenerationError::Fatal(err.to_string())
        }
    }
}
