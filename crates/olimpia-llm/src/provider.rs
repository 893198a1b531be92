//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for LLM providers
///
/// Implementations of this trait provide access to different LLM services.
/// A provider instance is bound to one credential; callers rotating keys
/// build one provider per key.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    ///
    /// # Arguments
    ///
    /// * `request` - The completion request with messages and parameters
    ///
    /// # Returns
    ///
    /// The completion response with the assistant's message and metadata
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g., "gemini")
    fn name(&self) -> &str;
}
