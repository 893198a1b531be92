//! MiniJinja-backed templates
//!
//! Templates use standard Jinja2 syntax (`{{ var }}`, `{% if %}`, `{% for %}`).
//! Besides the MiniJinja builtins, every environment carries two filters:
//!
//! - `upper_pt`: Unicode uppercase that keeps accents (`ação` → `AÇÃO`)
//! - `or_na`: replaces a missing, empty or whitespace-only value with `N/A`

use crate::{Language, PromptError, PromptTemplate, Result};
use minijinja::{Environment, Value};
use std::collections::HashMap;

/// A prompt or report template with per-language variants
///
/// ```
/// use olimpia_prompt::{JinjaTemplate, Language, PromptTemplate};
/// use serde_json::json;
///
/// let t = JinjaTemplate::bilingual(
///     "greeting",
///     "Report for {{ company | upper_pt }}",
///     "Relatório de {{ company | upper_pt }}",
/// ).unwrap();
///
/// let out = t.render(&Language::Portuguese, &json!({ "company": "Itaú" })).unwrap();
/// assert_eq!(out, "Relatório de ITAÚ");
/// ```
pub struct JinjaTemplate {
    name: String,
    variants: HashMap<Language, String>,
}

impl JinjaTemplate {
    pub fn builder(name: impl Into<String>) -> JinjaTemplateBuilder {
        JinjaTemplateBuilder::new(name)
    }

    /// Single English variant
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Result<Self> {
        Self::builder(name).english(template).build()
    }

    /// English and Portuguese variants
    pub fn bilingual(
        name: impl Into<String>,
        english: impl Into<String>,
        portuguese: impl Into<String>,
    ) -> Result<Self> {
        Self::builder(name)
            .english(english)
            .portuguese(portuguese)
            .build()
    }
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.add_filter("upper_pt", |v: Value| v.to_string().to_uppercase());
    env.add_filter("or_na", |v: Value| {
        let text = if v.is_undefined() || v.is_none() {
            String::new()
        } else {
            v.to_string()
        };
        if text.trim().is_empty() {
            "N/A".to_string()
        } else {
            text
        }
    });
    env
}

impl PromptTemplate for JinjaTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn languages(&self) -> Vec<Language> {
        self.variants.keys().cloned().collect()
    }

    fn render(&self, lang: &Language, vars: &serde_json::Value) -> Result<String> {
        let source = self
            .variants
            .get(lang)
            .ok_or_else(|| PromptError::MissingVariant {
                name: self.name.clone(),
                language: lang.code().to_string(),
            })?;

        let ctx = Value::from_serialize(vars);
        environment()
            .render_str(source, ctx)
            .map_err(|e| PromptError::Render {
                name: self.name.clone(),
                detail: e.to_string(),
            })
    }

    fn raw_template(&self, lang: &Language) -> Option<&str> {
        self.variants.get(lang).map(String::as_str)
    }
}

impl std::fmt::Debug for JinjaTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinjaTemplate")
            .field("name", &self.name)
            .field("languages", &self.variants.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`JinjaTemplate`]
pub struct JinjaTemplateBuilder {
    name: String,
    variants: HashMap<Language, String>,
}

impl JinjaTemplateBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: HashMap::new(),
        }
    }

    pub fn variant(mut self, lang: Language, source: impl Into<String>) -> Self {
        self.variants.insert(lang, source.into());
        self
    }

    pub fn english(self, source: impl Into<String>) -> Self {
        self.variant(Language::English, source)
    }

    pub fn portuguese(self, source: impl Into<String>) -> Self {
        self.variant(Language::Portuguese, source)
    }

    /// Check every variant renders against an empty context, then build
    ///
    /// Variants must therefore tolerate undefined variables at the top level
    /// (plain `{{ var }}`, filters, `{% if %}`, loops).
    pub fn build(self) -> Result<JinjaTemplate> {
        if self.variants.is_empty() {
            return Err(PromptError::Empty(self.name));
        }

        let env = environment();
        for (lang, source) in &self.variants {
            env.render_str(source, ())
                .map_err(|e| PromptError::Parse {
                    name: self.name.clone(),
                    language: lang.code().to_string(),
                    detail: e.to_string(),
                })?;
        }

        Ok(JinjaTemplate {
            name: self.name,
            variants: self.variants,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bilingual_render() {
        let t = JinjaTemplate::bilingual("t", "Price: {{ p }}", "Preço: {{ p }}").unwrap();

        let en = t.render(&Language::English, &json!({ "p": "R$ 10,00" })).unwrap();
        let pt = t
            .render(&Language::Portuguese, &json!({ "p": "R$ 10,00" }))
            .unwrap();
        assert_eq!(en, "Price: R$ 10,00");
        assert_eq!(pt, "Preço: R$ 10,00");
    }

    #[test]
    fn test_or_na_filter() {
        let t = JinjaTemplate::new("t", "[{{ summary | or_na }}]").unwrap();
        let blank = t.render(&Language::English, &json!({ "summary": "  " })).unwrap();
        let full = t.render(&Language::English, &json!({ "summary": "ok" })).unwrap();
        assert_eq!(blank, "[N/A]");
        assert_eq!(full, "[ok]");
    }

    #[test]
    fn test_markdown_is_not_escaped() {
        let t = JinjaTemplate::new("t", "{{ news }}").unwrap();
        let out = t
            .render(
                &Language::English,
                &json!({ "news": "* **[A & B](https://x.com/?a=1&b=2)**" }),
            )
            .unwrap();
        assert_eq!(out, "* **[A & B](https://x.com/?a=1&b=2)**");
    }

    #[test]
    fn test_loop_over_items() {
        let t = JinjaTemplate::new(
            "t",
            "{% for c in items %}ID {{ loop.index0 }}: {{ c.title }}\n{% endfor %}",
        )
        .unwrap();
        let out = t
            .render(
                &Language::English,
                &json!({ "items": [{ "title": "Lucro sobe" }, { "title": "Dividendos" }] }),
            )
            .unwrap();
        assert!(out.contains("ID 0: Lucro sobe"));
        assert!(out.contains("ID 1: Dividendos"));
    }

    #[test]
    fn test_build_errors() {
        assert!(matches!(
            JinjaTemplate::builder("empty").build(),
            Err(PromptError::Empty(_))
        ));
        assert!(matches!(
            JinjaTemplate::new("broken", "{{ unclosed"),
            Err(PromptError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_variant() {
        let t = JinjaTemplate::new("t", "Hello").unwrap();
        assert!(t.render(&Language::Portuguese, &json!({})).is_err());
        assert_eq!(
            t.render_with_fallback(&Language::Portuguese, &json!({})).unwrap(),
            "Hello"
        );
    }
}
