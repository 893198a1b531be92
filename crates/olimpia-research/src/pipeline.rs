//! Sequential research pipeline
//!
//! One [`ResearchState`] goes through the stages in a fixed order. Stages
//! degrade to placeholders instead of failing, so a run always ends with a
//! report.

use crate::api::{
    GeminiGenerator, HttpLinkChecker, LinkChecker, MarketDataProvider, SearchBackend,
    SearchProvider, TextGenerator, YahooMarketData,
};
use crate::config::ResearchConfig;
use crate::error::Result;
use crate::prompts;
use crate::stages::{EvidenceCollector, MetricsComputer, ReportSynthesizer, TickerResolver};
use crate::state::ResearchState;
use async_trait::async_trait;
use olimpia_prompt::PromptRegistry;
use std::sync::Arc;
use tracing::{Instrument, info, info_span};

/// One step of the pipeline
///
/// A stage reads fields written by earlier stages and writes only its own.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, state: &mut ResearchState);
}

/// Capability implementations used by the stages
#[derive(Clone)]
pub struct Capabilities {
    pub search: Arc<dyn SearchProvider>,
    pub market: Arc<dyn MarketDataProvider>,
    pub links: Arc<dyn LinkChecker>,
    /// Generator for ticker lookup
    pub ticker_generator: Option<Arc<dyn TextGenerator>>,
    /// Generator for news curation and the report
    pub report_generator: Option<Arc<dyn TextGenerator>>,
}

impl Capabilities {
    /// Production adapters selected from `config`
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let search: Arc<dyn SearchProvider> = Arc::new(SearchBackend::from_config(config)?);
        let market: Arc<dyn MarketDataProvider> = Arc::new(YahooMarketData::new(
            config.market_cache_ttl,
            config.request_timeout,
        )?);
        let links: Arc<dyn LinkChecker> = Arc::new(HttpLinkChecker::new()?);

        let (ticker_generator, report_generator) = if config.has_generation() {
            let ticker: Arc<dyn TextGenerator> = Arc::new(GeminiGenerator::from_config(
                config,
                config.ticker_temperature,
            ));
            let report: Arc<dyn TextGenerator> = Arc::new(GeminiGenerator::from_config(
                config,
                config.report_temperature,
            ));
            (Some(ticker), Some(report))
        } else {
            (None, None)
        };

        Ok(Self {
            search,
            market,
            links,
            ticker_generator,
            report_generator,
        })
    }
}

/// Resolver, collector, metrics and synthesizer, in that order
pub struct ResearchPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl ResearchPipeline {
    /// Pipeline backed by the production adapters
    pub fn from_config(config: Arc<ResearchConfig>) -> Result<Self> {
        config.validate()?;
        let capabilities = Capabilities::from_config(&config)?;
        Self::new(config, capabilities)
    }

    /// Pipeline over the given capabilities
    pub fn new(config: Arc<ResearchConfig>, capabilities: Capabilities) -> Result<Self> {
        let prompts: Arc<PromptRegistry> = Arc::new(prompts::registry(config.language.clone())?);
        let Capabilities {
            search,
            market,
            links,
            ticker_generator,
            report_generator,
        } = capabilities;

        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(TickerResolver::new(
                config.clone(),
                market.clone(),
                search.clone(),
                ticker_generator,
                prompts.clone(),
            )),
            Box::new(EvidenceCollector::new(
                config.clone(),
                search,
                links,
                report_generator.clone(),
                prompts.clone(),
            )),
            Box::new(MetricsComputer::new(config.clone(), market)),
            Box::new(ReportSynthesizer::new(config, report_generator, prompts)),
        ];

        Ok(Self { stages })
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Research one company
    pub async fn run(&self, company: impl Into<String>) -> ResearchState {
        let mut state = ResearchState::new(company);
        info!(run_id = %state.run_id(), company = state.company_name(), "Research started");

        for stage in &self.stages {
            let span = info_span!("stage", run_id = %state.run_id(), stage = stage.name());
            stage.run(&mut state).instrument(span).await;
        }

        info!(
            run_id = %state.run_id(),
            ticker = state.ticker_or_sentinel(),
            "Research finished"
        );
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::generation::MockTextGenerator;
    use crate::api::links::MockLinkChecker;
    use crate::api::market::MockMarketDataProvider;
    use crate::api::search::MockSearchProvider;
    use crate::state::NO_TICKER;

    fn capabilities(search: MockSearchProvider, market: MockMarketDataProvider) -> Capabilities {
        Capabilities {
            search: Arc::new(search),
            market: Arc::new(market),
            links: Arc::new(MockLinkChecker::new()),
            ticker_generator: None,
            report_generator: None,
        }
    }

    #[test]
    fn test_stage_order() {
        let pipeline = ResearchPipeline::new(
            Arc::new(ResearchConfig::default()),
            capabilities(MockSearchProvider::new(), MockMarketDataProvider::new()),
        )
        .unwrap();
        assert_eq!(
            pipeline.stage_names(),
            [
                "ticker_resolver",
                "evidence_collector",
                "metrics_computer",
                "report_synthesizer"
            ]
        );
    }

    #[tokio::test]
    async fn test_unresolvable_company_still_reports() {
        let mut search = MockSearchProvider::new();
        search.expect_search().returning(|_, _| Ok(Vec::new()));
        let mut market = MockMarketDataProvider::new();
        market.expect_latest_price().returning(|_| Ok(None));
        market
            .expect_price_history()
            .returning(|_, _, _| Ok(Vec::new()));

        let pipeline = ResearchPipeline::new(
            Arc::new(ResearchConfig::default()),
            capabilities(search, market),
        )
        .unwrap();
        let state = pipeline.run("Zq").await;

        assert_eq!(state.ticker(), Some(NO_TICKER));
        assert_eq!(state.stock_data(), Some("Data unavailable"));
        assert_eq!(state.news_data(), Some("No relevant news found."));
        assert!(state.final_report().is_some_and(|r| r.contains("Mock Mode")));
    }

    #[tokio::test]
    async fn test_generator_is_shared_by_curation_and_report() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_, _| Ok("# Generated".to_string()));

        let mut search = MockSearchProvider::new();
        search.expect_search().returning(|_, _| Ok(Vec::new()));
        let mut market = MockMarketDataProvider::new();
        market
            .expect_price_history()
            .returning(|_, _, _| Ok(Vec::new()));
        market.expect_info().returning(|_| Ok(Default::default()));

        let config = ResearchConfig::builder()
            .generation_keys(["k1"])
            .build()
            .unwrap();
        let mut caps = capabilities(search, market);
        caps.report_generator = Some(Arc::new(generator) as Arc<dyn TextGenerator>);

        let pipeline = ResearchPipeline::new(Arc::new(config), caps).unwrap();
        let state = pipeline.run("Ambev").await;

        assert_eq!(state.ticker(), Some("ABEV3.SA"));
        assert_eq!(state.final_report(), Some("# Generated"));
    }
}
