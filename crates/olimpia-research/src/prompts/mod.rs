//! Prompt templates and fixed labels of the research pipeline

mod labels;
mod templates;

pub use labels::Labels;
pub use templates::*;

use olimpia_prompt::{Language, PromptRegistry, Result};

/// Register every research template with `registry`
pub fn register_prompts(registry: &PromptRegistry) -> Result<()> {
    registry.register(ticker_prompt()?);
    registry.register(curation_prompt()?);
    registry.register(report_prompt()?);
    registry.register(fallback_report()?);
    Ok(())
}

/// A registry holding every research template, defaulting to `lang`
pub fn registry(lang: Language) -> Result<PromptRegistry> {
    let registry = PromptRegistry::with_language(lang);
    register_prompts(&registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_all_prompts() {
        let registry = registry(Language::English).unwrap();
        for name in [TICKER, CURATION, REPORT, FALLBACK] {
            let template = registry.get(name).unwrap();
            assert!(template.supports_language(&Language::English));
            assert!(template.supports_language(&Language::Portuguese));
        }
    }

    #[test]
    fn test_ticker_prompt_pt() {
        let registry = registry(Language::Portuguese).unwrap();
        let prompt = registry
            .render(TICKER, &json!({ "company": "Magazine Luiza" }))
            .unwrap();
        assert!(prompt.contains("'Magazine Luiza'"));
        assert!(prompt.contains("Responda APENAS o código"));
    }

    #[test]
    fn test_curation_lists_candidates() {
        let registry = registry(Language::English).unwrap();
        let prompt = registry
            .render(
                CURATION,
                &json!({
                    "company": "WEG",
                    "ticker": "WEGE3",
                    "count": 3,
                    "candidates": [
                        { "title": "WEG lucra", "url": "https://a.com/1", "snippet": "lucro" },
                        { "title": "WEG compra", "url": "https://b.com/2", "snippet": "aquisição" }
                    ]
                }),
            )
            .unwrap();
        assert!(prompt.contains("ID 1:"));
        assert!(prompt.contains("Link: https://b.com/2"));
        assert!(prompt.contains("Return ONLY 3 items"));
    }

    #[test]
    fn test_fallback_report_layout() {
        let registry = registry(Language::Portuguese).unwrap();
        let report = registry
            .render(
                FALLBACK,
                &json!({
                    "company": "Ambev",
                    "ticker": "ABEV3.SA",
                    "stock_data": "TABLE",
                    "summary": "SUMMARY",
                    "news": "NEWS",
                    "reason": Labels::for_language(&Language::Portuguese).reason_mock,
                }),
            )
            .unwrap();
        assert!(report.starts_with("# 🏛️ Equity Research: AMBEV (ABEV3.SA)"));
        assert!(report.contains("\n\nTABLE\n\n## 🏢 Perfil Corporativo\nSUMMARY\n"));
        assert!(report.ends_with("*Relatório gerado via Modo Mock (Dados reais coletados)*"));
    }

    #[test]
    fn test_labels_fall_back_to_english() {
        let labels = Labels::for_language(&Language::Other("es".to_string()));
        assert_eq!(labels.no_news, "No relevant news found.");
    }
}
