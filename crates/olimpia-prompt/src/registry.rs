//! Thread-safe template registry

use crate::{Language, PromptError, PromptTemplate, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Named templates plus a default language
///
/// ```
/// use olimpia_prompt::{JinjaTemplate, Language, PromptRegistry};
/// use serde_json::json;
///
/// let registry = PromptRegistry::with_language(Language::Portuguese);
/// registry.register(JinjaTemplate::bilingual("hi", "Hi {{ n }}", "Olá {{ n }}").unwrap());
///
/// assert_eq!(registry.render("hi", &json!({ "n": "B3" })).unwrap(), "Olá B3");
/// ```
pub struct PromptRegistry {
    templates: RwLock<HashMap<String, Arc<dyn PromptTemplate>>>,
    default_language: RwLock<Language>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::with_language(Language::English)
    }

    pub fn with_language(lang: Language) -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            default_language: RwLock::new(lang),
        }
    }

    pub fn set_default_language(&self, lang: Language) {
        if let Ok(mut default) = self.default_language.write() {
            *default = lang;
        }
    }

    pub fn default_language(&self) -> Language {
        self.default_language
            .read()
            .map(|l| l.clone())
            .unwrap_or_default()
    }

    /// Register a template, replacing any previous one with the same name
    pub fn register<T: PromptTemplate + 'static>(&self, template: T) {
        if let Ok(mut templates) = self.templates.write() {
            templates.insert(template.name().to_string(), Arc::new(template));
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PromptTemplate>> {
        self.templates.read().ok()?.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates
            .read()
            .map(|t| t.contains_key(name))
            .unwrap_or(false)
    }

    /// Render in the default language
    pub fn render(&self, name: &str, vars: &serde_json::Value) -> Result<String> {
        self.render_with_lang(name, &self.default_language(), vars)
    }

    /// Render in `lang`, falling back as [`PromptTemplate::render_with_fallback`] does
    pub fn render_with_lang(
        &self,
        name: &str,
        lang: &Language,
        vars: &serde_json::Value,
    ) -> Result<String> {
        let template = self
            .get(name)
            .ok_or_else(|| PromptError::NotRegistered(name.to_string()))?;
        template.render_with_fallback(lang, vars)
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .templates
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PromptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRegistry")
            .field("default_language", &self.default_language())
            .field("templates", &self.list())
            .finish()
    }
}
