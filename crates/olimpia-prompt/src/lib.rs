//! Prompt and report templates for olimpia
//!
//! Every text sent to the generation provider and every deterministic report
//! produced without it is a [`JinjaTemplate`] with an English and a Portuguese
//! variant, looked up by name in a [`PromptRegistry`].
//!
//! ```
//! use olimpia_prompt::{JinjaTemplate, Language, PromptRegistry};
//! use serde_json::json;
//!
//! let registry = PromptRegistry::new();
//! registry.register(JinjaTemplate::bilingual(
//!     "ticker",
//!     "What is the B3 ticker of '{{ company }}'?",
//!     "Qual o ticker da empresa '{{ company }}' na B3?",
//! ).unwrap());
//!
//! let prompt = registry
//!     .render_with_lang("ticker", &Language::Portuguese, &json!({ "company": "Vale" }))
//!     .unwrap();
//! assert_eq!(prompt, "Qual o ticker da empresa 'Vale' na B3?");
//! ```

mod error;
mod jinja;
mod language;
mod registry;
mod template;

pub use error::{PromptError, Result};
pub use jinja::{JinjaTemplate, JinjaTemplateBuilder};
pub use language::Language;
pub use registry::PromptRegistry;
pub use template::PromptTemplate;
