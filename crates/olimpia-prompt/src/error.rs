//! Error types for prompt operations

use thiserror::Error;

/// Result type for prompt operations
pub type Result<T> = std::result::Result<T, PromptError>;

/// Errors that can occur while building or rendering templates
#[derive(Error, Debug)]
pub enum PromptError {
    /// Template has no variant for the requested language
    #[error("Template '{name}' has no '{language}' variant")]
    MissingVariant { name: String, language: String },

    /// Template source failed to compile
    #[error("Failed to parse template '{name}' ({language}): {detail}")]
    Parse {
        name: String,
        language: String,
        detail: String,
    },

    /// Rendering failed (undefined filter, type error in an expression, ...)
    #[error("Failed to render template '{name}': {detail}")]
    Render { name: String, detail: String },

    /// Builder finished without any variant
    #[error("No variants provided for '{0}'")]
    Empty(String),

    /// Lookup of an unregistered template
    #[error("Template '{0}' not registered")]
    NotRegistered(String),
}
