//! Final report
//!
//! Generation runs through the shared credential rotation. Every path that
//! does not end in an accepted reply renders the deterministic fallback
//! template instead, so the report is never empty.

use crate::api::TextGenerator;
use crate::config::ResearchConfig;
use crate::pipeline::Stage;
use crate::prompts::{self, Labels};
use crate::rotation::{self, OnReject, RotationOutcome, RotationPolicy};
use crate::state::ResearchState;
use async_trait::async_trait;
use olimpia_prompt::PromptRegistry;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

/// Turns the collected fields into the final report
pub struct ReportSynthesizer {
    config: Arc<ResearchConfig>,
    generator: Option<Arc<dyn TextGenerator>>,
    prompts: Arc<PromptRegistry>,
}

impl ReportSynthesizer {
    pub fn new(
        config: Arc<ResearchConfig>,
        generator: Option<Arc<dyn TextGenerator>>,
        prompts: Arc<PromptRegistry>,
    ) -> Self {
        Self {
            config,
            generator,
            prompts,
        }
    }

    fn labels(&self) -> &'static Labels {
        Labels::for_language(&self.config.language)
    }

    /// Generated report, or the fallback template naming why
    pub async fn synthesize(&self, state: &ResearchState) -> String {
        let labels = self.labels();
        let vars = template_vars(state);

        let generator = match &self.generator {
            Some(g) if self.config.has_generation() => g,
            _ => {
                info!("No generation credentials, rendering mock report");
                return self.fallback(&vars, labels.reason_mock);
            }
        };

        let prompt = match self
            .prompts
            .render_with_lang(prompts::REPORT, &self.config.language, &vars)
        {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Report prompt failed to render");
                return self.fallback(&vars, labels.reason_failed);
            }
        };

        let policy = RotationPolicy::default()
            .with_on_reject(OnReject::Stop)
            .with_final_wait(self.config.final_quota_wait);
        let outcome = rotation::rotate(
            generator.as_ref(),
            &prompt,
            &self.config.generation_keys,
            policy,
            |reply| {
                let reply = reply.trim();
                (!reply.is_empty()).then(|| reply.to_string())
            },
        )
        .await;

        match outcome {
            RotationOutcome::Accepted { value, key_index } => {
                info!(key = key_index + 1, "Report generated");
                value
            }
            RotationOutcome::QuotaExhausted => {
                warn!("Every key is quota-limited, rendering fallback report");
                self.fallback(&vars, labels.reason_exhausted)
            }
            RotationOutcome::NoCredentials => self.fallback(&vars, labels.reason_mock),
            RotationOutcome::Fatal(reason) => {
                warn!(%reason, "Generation failed, rendering fallback report");
                self.fallback(&vars, labels.reason_failed)
            }
            RotationOutcome::Rejected => {
                warn!("Empty generation reply, rendering fallback report");
                self.fallback(&vars, labels.reason_failed)
            }
        }
    }

    /// The deterministic report
    pub fn fallback(&self, vars: &Value, reason: &str) -> String {
        let mut vars = vars.clone();
        vars["reason"] = json!(reason);

        match self
            .prompts
            .render_with_lang(prompts::FALLBACK, &self.config.language, &vars)
        {
            Ok(report) if !report.trim().is_empty() => report,
            Ok(_) => plain_report(&vars, reason),
            Err(e) => {
                warn!(error = %e, "Fallback template failed to render");
                plain_report(&vars, reason)
            }
        }
    }
}

/// Variables shared by the report prompt and the fallback template
pub fn template_vars(state: &ResearchState) -> Value {
    json!({
        "company": state.company_name(),
        "ticker": state.ticker_or_sentinel(),
        "stock_data": state.stock_data().unwrap_or_default(),
        "summary": state.summary_data().unwrap_or_default(),
        "news": state.news_data().unwrap_or_default(),
    })
}

fn plain_report(vars: &Value, reason: &str) -> String {
    let field = |key: &str| vars[key].as_str().unwrap_or_default().to_string();
    format!(
        "# Equity Research: {} ({})\n\n{}\n\n{}\n\n{}\n\n---\n*{reason}*",
        field("company").to_uppercase(),
        field("ticker"),
        field("stock_data"),
        field("summary"),
        field("news"),
    )
}

#[async_trait]
impl Stage for ReportSynthesizer {
    fn name(&self) -> &'static str {
        "report_synthesizer"
    }

    async fn run(&self, state: &mut ResearchState) {
        let report = self.synthesize(state).await;
        state.set_final_report(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::generation::MockTextGenerator;
    use crate::error::GenerationError;
    use olimpia_prompt::Language;

    fn collected_state() -> ResearchState {
        let mut state = ResearchState::new("Vale");
        state.set_ticker("VALE3.SA");
        state.set_evidence("- Mineradora global.", "* **[A](https://a.com)**\n  > a");
        state.set_stock_data("[dashboard]");
        state
    }

    fn synthesizer(
        keys: &[&str],
        generator: Option<MockTextGenerator>,
        language: Language,
    ) -> ReportSynthesizer {
        let config = ResearchConfig {
            generation_keys: keys.iter().map(|k| (*k).to_string()).collect(),
            language: language.clone(),
            ..ResearchConfig::default()
        };
        ReportSynthesizer::new(
            Arc::new(config),
            generator.map(|g| Arc::new(g) as Arc<dyn TextGenerator>),
            Arc::new(prompts::registry(language).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_mock_mode_report() {
        let s = synthesizer(&[], None, Language::Portuguese);
        let report = s.synthesize(&collected_state()).await;

        assert_eq!(
            report,
            "# 🏛️ Equity Research: VALE (VALE3.SA)\n\n[dashboard]\n\n\
             ## 🏢 Perfil Corporativo\n- Mineradora global.\n\n\
             ## 📰 Notícias Recentes\n* **[A](https://a.com)**\n  > a\n\n\
             ---\n*Relatório gerado via Modo Mock (Dados reais coletados)*"
        );
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|prompt, key| key == "A" && prompt.contains("[dashboard]"))
            .times(1)
            .returning(|_, _| Ok("# Report".to_string()));

        let s = synthesizer(&["A", "B", "C"], Some(generator), Language::English);
        assert_eq!(s.synthesize(&collected_state()).await, "# Report");
    }

    #[tokio::test]
    async fn test_quota_rotates_then_succeeds() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|_, key| key == "A")
            .times(1)
            .returning(|_, _| Err(GenerationError::QuotaExceeded("429".to_string())));
        generator
            .expect_generate()
            .withf(|_, key| key == "B")
            .times(1)
            .returning(|_, _| Ok("from B".to_string()));

        let s = synthesizer(&["A", "B"], Some(generator), Language::English);
        assert_eq!(s.synthesize(&collected_state()).await, "from B");
    }

    #[tokio::test]
    async fn test_all_quota_limited() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(2)
            .returning(|_, _| Err(GenerationError::QuotaExceeded("RESOURCE_EXHAUSTED".to_string())));

        let s = synthesizer(&["A", "B"], Some(generator), Language::English);
        let report = s.synthesize(&collected_state()).await;
        assert!(report.starts_with("# 🏛️ Equity Research: VALE (VALE3.SA)"));
        assert!(report.ends_with("*Report generated via Fallback (all keys exhausted) (real collected data)*"));
    }

    #[tokio::test]
    async fn test_fatal_error_stops_rotation() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|_, key| key == "A")
            .times(1)
            .returning(|_, _| Err(GenerationError::Fatal("invalid model".to_string())));
        generator
            .expect_generate()
            .withf(|_, key| key == "B")
            .times(0);

        let s = synthesizer(&["A", "B"], Some(generator), Language::Portuguese);
        let report = s.synthesize(&collected_state()).await;
        assert!(report.contains("Fallback (Falha na geração)"));
    }

    #[tokio::test]
    async fn test_report_never_empty_with_empty_state() {
        let s = synthesizer(&[], None, Language::English);
        let report = s.synthesize(&ResearchState::new("")).await;
        assert!(!report.trim().is_empty());
    }
}
