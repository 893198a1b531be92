//! Core prompt template trait

use crate::{Language, PromptError, Result};

/// A named template with one variant per language
///
/// Variables are passed as `serde_json::Value` so the trait stays
/// dyn-compatible and templates can live in a registry as trait objects.
pub trait PromptTemplate: Send + Sync {
    /// Registry key, e.g. `research.report`
    fn name(&self) -> &str;

    /// Languages this template has a variant for
    fn languages(&self) -> Vec<Language>;

    fn supports_language(&self, lang: &Language) -> bool {
        self.languages().contains(lang)
    }

    /// Render the variant for `lang`; errors if there is none
    fn render(&self, lang: &Language, vars: &serde_json::Value) -> Result<String>;

    /// Render `lang`, else English, else whichever variant exists
    fn render_with_fallback(&self, lang: &Language, vars: &serde_json::Value) -> Result<String> {
        if self.supports_language(lang) {
            return self.render(lang, vars);
        }
        if self.supports_language(&Language::English) {
            return self.render(&Language::English, vars);
        }

        let first = self
            .languages()
            .into_iter()
            .next()
            .ok_or_else(|| PromptError::Empty(self.name().to_string()))?;
        self.render(&first, vars)
    }

    /// Raw template source for a language
    fn raw_template(&self, lang: &Language) -> Option<&str>;
}
