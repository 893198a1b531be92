//! Company name to exchange ticker
//!
//! Strategies run in a fixed order, cheapest and most precise first. A symbol
//! is only accepted after the market-data feed confirms it has prices, except
//! for the curated alias table which is trusted as is.

use crate::api::{MarketDataProvider, Period, SearchOptions, SearchProvider, TextGenerator};
use crate::config::ResearchConfig;
use crate::pipeline::Stage;
use crate::prompts;
use crate::rotation::{self, OnFatal, OnReject, RotationPolicy};
use crate::state::{NO_TICKER, ResearchState};
use async_trait::async_trait;
use olimpia_prompt::PromptRegistry;
use olimpia_utils::fold_accents;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static ESCAPE_REMNANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+;?\d*[A-Za-z]").expect("valid escape regex"));
static DIRECT_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{4})(3|4|11)\b").expect("valid symbol regex"));
static SYMBOL_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{4}(?:3|4|11))\b").expect("valid symbol regex"));
static TICKER_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{4}\d\b").expect("valid ticker-like regex"));

/// Curated issuers, matched before any network call
pub const KNOWN_TICKERS: &[(&str, &str)] = &[
    ("MAGAZINE LUIZA", "MGLU3.SA"),
    ("MAGALU", "MGLU3.SA"),
    ("MGLU", "MGLU3.SA"),
    ("PETROBRAS", "PETR4.SA"),
    ("PETRO", "PETR4.SA"),
    ("VALE", "VALE3.SA"),
    ("ITAU", "ITUB4.SA"),
    ("ITAU UNIBANCO", "ITUB4.SA"),
    ("BRADESCO", "BBDC4.SA"),
    ("AMBEV", "ABEV3.SA"),
    ("BANCO DO BRASIL", "BBAS3.SA"),
    ("BB", "BBAS3.SA"),
    ("B3", "B3SA3.SA"),
    ("WEG", "WEGE3.SA"),
    ("LOCALIZA", "RENT3.SA"),
    ("SUZANO", "SUZB3.SA"),
    ("GERDAU", "GGBR4.SA"),
    ("RAIA DROGASIL", "RADL3.SA"),
    ("RD SAUDE", "RADL3.SA"),
    ("RUMO", "RAIL3.SA"),
    ("VIBRA", "VBBR3.SA"),
    ("COSAN", "CSAN3.SA"),
    ("TELEFONICA", "VIVT3.SA"),
    ("VIVO", "VIVT3.SA"),
    ("CCR", "CCRO3.SA"),
    ("HAPVIDA", "HAPV3.SA"),
    ("SABESP", "SBSP3.SA"),
    ("EQUATORIAL", "EQTL3.SA"),
    ("KLABIN", "KLBN11.SA"),
    ("LOJAS RENNER", "LREN3.SA"),
    ("RENNER", "LREN3.SA"),
    ("EMBRAER", "EMBR3.SA"),
    ("HYPERA", "HYPE3.SA"),
    ("MINERVA", "BEEF3.SA"),
    ("MARFRIG", "MRFG3.SA"),
    ("JBS", "JBSS3.SA"),
    ("BRF", "BRFS3.SA"),
    ("SANEPAR", "SAPR11.SA"),
    ("SAPR", "SAPR11.SA"),
    ("CEMIG", "CMIG4.SA"),
    ("COPEL", "CPLE6.SA"),
    ("ELETROBRAS", "ELET3.SA"),
    ("ELET", "ELET3.SA"),
];

/// Resolution strategies, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    Direct,
    KnownAlias,
    Search,
    Ai,
    Heuristic,
}

pub const CASCADE: [Strategy; 5] = [
    Strategy::Direct,
    Strategy::KnownAlias,
    Strategy::Search,
    Strategy::Ai,
    Strategy::Heuristic,
];

/// A resolved ticker and the strategy that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTicker {
    pub ticker: String,
    pub strategy: Strategy,
}

/// Cleaned forms of the user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyInput {
    /// Escape remnants removed, original case, for search queries and prompts
    pub display: String,
    /// Uppercased display form, for symbol patterns
    pub upper: String,
    /// Uppercased and accent-folded, for the alias table
    pub folded: String,
}

impl CompanyInput {
    pub fn parse(raw: &str) -> Self {
        let no_esc: String = raw.chars().filter(|c| *c != '\u{1b}').collect();
        let no_remnants = ESCAPE_REMNANT.replace_all(&no_esc, "");
        let display = no_remnants
            .replace('^', "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_string();
        let upper = display.to_uppercase();
        let folded = fold_accents(&upper);
        Self {
            display,
            upper,
            folded,
        }
    }
}

/// Look the input up in the alias table: exact match or match on its first word
pub fn known_alias(input: &CompanyInput) -> Option<&'static str> {
    let first_word = input.folded.split_whitespace().next().unwrap_or_default();
    KNOWN_TICKERS
        .iter()
        .find(|(alias, _)| *alias == input.folded || *alias == first_word)
        .map(|(_, ticker)| *ticker)
}

/// Last-resort guess built from the input itself
///
/// `VALE 3` guesses `VALE3`; `Natura` guesses `NATU` plus the default class.
pub fn heuristic_symbol(input: &CompanyInput, default_class: char) -> Option<String> {
    let clean: String = input
        .folded
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();

    if clean.len() >= 5 && (clean.ends_with('3') || clean.ends_with('4')) {
        let last = clean.chars().last()?;
        return Some(format!("{}{last}", &clean[..4]));
    }

    let letters: String = clean.chars().filter(char::is_ascii_alphabetic).take(4).collect();
    (letters.len() == 4).then(|| format!("{letters}{default_class}"))
}

/// Resolves a company name to a validated ticker
pub struct TickerResolver {
    config: Arc<ResearchConfig>,
    market: Arc<dyn MarketDataProvider>,
    search: Arc<dyn SearchProvider>,
    generator: Option<Arc<dyn TextGenerator>>,
    prompts: Arc<PromptRegistry>,
}

impl TickerResolver {
    pub fn new(
        config: Arc<ResearchConfig>,
        market: Arc<dyn MarketDataProvider>,
        search: Arc<dyn SearchProvider>,
        generator: Option<Arc<dyn TextGenerator>>,
        prompts: Arc<PromptRegistry>,
    ) -> Self {
        Self {
            config,
            market,
            search,
            generator,
            prompts,
        }
    }

    /// Ticker for `company_name`, or the `N/A` sentinel
    pub async fn resolve(&self, company_name: &str) -> String {
        self.resolve_detailed(company_name)
            .await
            .map_or_else(|| NO_TICKER.to_string(), |r| r.ticker)
    }

    /// Like [`Self::resolve`], also reporting which strategy won
    pub async fn resolve_detailed(&self, company_name: &str) -> Option<ResolvedTicker> {
        let input = CompanyInput::parse(company_name);
        if input.upper.is_empty() {
            warn!("Empty company name");
            return None;
        }

        for strategy in CASCADE {
            if let Some(ticker) = self.attempt(strategy, &input).await {
                info!(?strategy, %ticker, "Ticker resolved");
                return Some(ResolvedTicker { ticker, strategy });
            }
            debug!(?strategy, "Strategy produced nothing");
        }

        warn!(company = %input.display, "No strategy produced a valid ticker");
        None
    }

    async fn attempt(&self, strategy: Strategy, input: &CompanyInput) -> Option<String> {
        match strategy {
            Strategy::Direct => self.direct(input).await,
            Strategy::KnownAlias => known_alias(input).map(str::to_string),
            Strategy::Search => self.from_search(input).await,
            Strategy::Ai => self.from_generation(input).await,
            Strategy::Heuristic => self.heuristic(input).await,
        }
    }

    fn with_suffix(&self, symbol: &str) -> String {
        format!("{symbol}{}", self.config.market_suffix)
    }

    /// True when the feed has a price or recent bars for `ticker`
    pub async fn validate(&self, ticker: &str) -> bool {
        match self.market.latest_price(ticker).await {
            Ok(Some(_)) => return true,
            Ok(None) => {}
            Err(e) => debug!(%ticker, error = %e, "Latest price lookup failed"),
        }

        match self.market.price_history(ticker, Period::Week, false).await {
            Ok(bars) => !bars.is_empty(),
            Err(e) => {
                debug!(%ticker, error = %e, "History lookup failed");
                false
            }
        }
    }

    async fn direct(&self, input: &CompanyInput) -> Option<String> {
        let symbol = {
            let caps = DIRECT_SYMBOL.captures(&input.upper)?;
            format!("{}{}", &caps[1], &caps[2])
        };
        let ticker = self.with_suffix(&symbol);
        self.validate(&ticker).await.then_some(ticker)
    }

    async fn from_search(&self, input: &CompanyInput) -> Option<String> {
        let company = &input.display;
        let region = &self.config.search_region;

        let mut queries: Vec<(String, usize, bool)> = vec![(
            format!(
                "site:statusinvest.com.br OR site:br.investing.com {company} código ação"
            ),
            3,
            false,
        )];
        if TICKER_LIKE.is_match(&input.upper) {
            queries.push((
                format!("ticker correto da empresa {company} statusinvest"),
                2,
                false,
            ));
        }
        queries.push((
            format!("qual o ticker código da ação da empresa {company} B3"),
            2,
            true,
        ));

        let mut tried = HashSet::new();
        for (query, max, use_bodies) in queries {
            let options = SearchOptions::new().region(region.clone()).max_results(max);
            let hits = match self.search.search(&query, &options).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(error = %e, "Ticker search failed");
                    continue;
                }
            };

            let symbols: Vec<String> = hits
                .iter()
                .flat_map(|hit| {
                    let text = if use_bodies { &hit.snippet } else { &hit.title };
                    SYMBOL_IN_TEXT
                        .find_iter(&text.to_uppercase())
                        .map(|m| m.as_str().to_string())
                        .collect::<Vec<_>>()
                })
                .collect();

            for symbol in symbols {
                let ticker = self.with_suffix(&symbol);
                if tried.insert(ticker.clone()) && self.validate(&ticker).await {
                    return Some(ticker);
                }
            }
        }

        None
    }

    async fn from_generation(&self, input: &CompanyInput) -> Option<String> {
        let generator = self.generator.as_ref()?;
        if !self.config.has_generation() {
            return None;
        }

        let prompt = match self.prompts.render_with_lang(
            prompts::TICKER,
            &self.config.language,
            &json!({ "company": input.display }),
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "Ticker prompt failed to render");
                return None;
            }
        };

        let policy = RotationPolicy::default()
            .with_on_reject(OnReject::Stop)
            .with_on_fatal(OnFatal::Continue);
        let symbol = rotation::rotate(
            generator.as_ref(),
            &prompt,
            &self.config.generation_keys,
            policy,
            |reply| {
                SYMBOL_IN_TEXT
                    .find(&reply.to_uppercase())
                    .map(|m| m.as_str().to_string())
            },
        )
        .await
        .accepted()?;

        let ticker = self.with_suffix(&symbol);
        self.validate(&ticker).await.then_some(ticker)
    }

    async fn heuristic(&self, input: &CompanyInput) -> Option<String> {
        let symbol = heuristic_symbol(input, self.config.default_share_class)?;
        let ticker = self.with_suffix(&symbol);
        let valid = self.validate(&ticker).await;
        if valid {
            warn!(%ticker, "Using a guessed ticker");
        }
        valid.then_some(ticker)
    }
}

#[async_trait]
impl Stage for TickerResolver {
    fn name(&self) -> &'static str {
        "ticker_resolver"
    }

    async fn run(&self, state: &mut ResearchState) {
        let ticker = self.resolve(state.company_name()).await;
        state.set_ticker(ticker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::generation::MockTextGenerator;
    use crate::api::market::MockMarketDataProvider;
    use crate::api::search::MockSearchProvider;
    use crate::api::{Candidate, PriceBar};
    use crate::error::GenerationError;
    use chrono::Utc;
    use olimpia_prompt::Language;

    fn market_valid_for(valid: &'static [&'static str]) -> MockMarketDataProvider {
        let mut market = MockMarketDataProvider::new();
        market
            .expect_latest_price()
            .returning(move |t| Ok(valid.contains(&t).then_some(10.0)));
        market
            .expect_price_history()
            .returning(|_, _, _| Ok(Vec::new()));
        market
    }

    fn resolver(
        config: ResearchConfig,
        market: MockMarketDataProvider,
        search: MockSearchProvider,
        generator: Option<MockTextGenerator>,
    ) -> TickerResolver {
        TickerResolver::new(
            Arc::new(config),
            Arc::new(market),
            Arc::new(search),
            generator.map(|g| Arc::new(g) as Arc<dyn TextGenerator>),
            Arc::new(prompts::registry(Language::English).unwrap()),
        )
    }

    fn empty_search() -> MockSearchProvider {
        let mut search = MockSearchProvider::new();
        search.expect_search().returning(|_, _| Ok(Vec::new()));
        search
    }

    #[test]
    fn test_input_normalisation() {
        let input = CompanyInput::parse("\u{1b}[1;32m  Itaú   Unibanco^ \u{1b}[0m");
        assert_eq!(input.display, "Itaú Unibanco");
        assert_eq!(input.upper, "ITAÚ UNIBANCO");
        assert_eq!(input.folded, "ITAU UNIBANCO");
    }

    #[test]
    fn test_known_alias_lookup() {
        assert_eq!(known_alias(&CompanyInput::parse("Ambev")), Some("ABEV3.SA"));
        assert_eq!(
            known_alias(&CompanyInput::parse("Petrobras Distribuidora")),
            Some("PETR4.SA")
        );
        assert_eq!(known_alias(&CompanyInput::parse("Totvs")), None);
    }

    #[test]
    fn test_heuristic_symbol() {
        assert_eq!(
            heuristic_symbol(&CompanyInput::parse("Natura"), '3').as_deref(),
            Some("NATU3")
        );
        assert_eq!(
            heuristic_symbol(&CompanyInput::parse("vale 4"), '3').as_deref(),
            Some("VALE4")
        );
        assert_eq!(heuristic_symbol(&CompanyInput::parse("Oi"), '3'), None);
    }

    #[tokio::test]
    async fn test_every_alias_resolves_without_network() {
        for (alias, ticker) in KNOWN_TICKERS {
            // Mocks without expectations panic on any call
            let r = resolver(
                ResearchConfig::default(),
                MockMarketDataProvider::new(),
                MockSearchProvider::new(),
                None,
            );
            assert_eq!(r.resolve(alias).await, *ticker, "alias {alias}");
        }
    }

    #[tokio::test]
    async fn test_ambev_resolves_from_alias() {
        let r = resolver(
            ResearchConfig::default(),
            MockMarketDataProvider::new(),
            MockSearchProvider::new(),
            None,
        );
        let resolved = r.resolve_detailed("Ambev").await.unwrap();
        assert_eq!(resolved.ticker, "ABEV3.SA");
        assert_eq!(resolved.strategy, Strategy::KnownAlias);
    }

    #[tokio::test]
    async fn test_direct_symbol_is_validated() {
        let r = resolver(
            ResearchConfig::default(),
            market_valid_for(&["PETR3.SA"]),
            MockSearchProvider::new(),
            None,
        );
        let resolved = r.resolve_detailed("petr3").await.unwrap();
        assert_eq!(resolved.ticker, "PETR3.SA");
        assert_eq!(resolved.strategy, Strategy::Direct);
    }

    #[tokio::test]
    async fn test_history_counts_as_valid() {
        let mut market = MockMarketDataProvider::new();
        market.expect_latest_price().returning(|_| Ok(None));
        market.expect_price_history().returning(|_, _, _| {
            Ok(vec![PriceBar {
                date: Utc::now(),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
            }])
        });
        let r = resolver(ResearchConfig::default(), market, MockSearchProvider::new(), None);
        assert_eq!(r.resolve("TAEE11").await, "TAEE11.SA");
    }

    #[tokio::test]
    async fn test_search_strategy_extracts_from_titles() {
        let mut search = MockSearchProvider::new();
        search.expect_search().returning(|query, _| {
            if query.starts_with("site:statusinvest") {
                Ok(vec![Candidate::new(
                    "TOTS3 - Totvs ON | Status Invest",
                    "https://statusinvest.com.br/acoes/tots3",
                    "",
                )])
            } else {
                Ok(Vec::new())
            }
        });

        let r = resolver(
            ResearchConfig::default(),
            market_valid_for(&["TOTS3.SA"]),
            search,
            None,
        );
        let resolved = r.resolve_detailed("Totvs").await.unwrap();
        assert_eq!(resolved.ticker, "TOTS3.SA");
        assert_eq!(resolved.strategy, Strategy::Search);
    }

    #[tokio::test]
    async fn test_search_strategy_reads_lowercase_snippets() {
        let mut search = MockSearchProvider::new();
        search.expect_search().returning(|query, _| {
            if query.starts_with("qual o ticker") {
                Ok(vec![Candidate::new(
                    "Totvs na bolsa",
                    "https://example.com/totvs",
                    "O código da ação da Totvs é tots3 na B3.",
                )])
            } else {
                Ok(Vec::new())
            }
        });

        let r = resolver(
            ResearchConfig::default(),
            market_valid_for(&["TOTS3.SA"]),
            search,
            None,
        );
        let resolved = r.resolve_detailed("Totvs Sistemas").await.unwrap();
        assert_eq!(resolved.ticker, "TOTS3.SA");
        assert_eq!(resolved.strategy, Strategy::Search);
    }

    #[tokio::test]
    async fn test_ai_strategy() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok(" rdor3 ".to_string()));

        let config = ResearchConfig::builder()
            .generation_keys(["k1", "k2"])
            .build()
            .unwrap();
        let r = resolver(
            config,
            market_valid_for(&["RDOR3.SA"]),
            empty_search(),
            Some(generator),
        );
        let resolved = r.resolve_detailed("Rede D'Or").await.unwrap();
        assert_eq!(resolved.ticker, "RDOR3.SA");
        assert_eq!(resolved.strategy, Strategy::Ai);
    }

    #[tokio::test]
    async fn test_ai_reply_without_symbol_ends_rotation() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok("N/A".to_string()));

        let config = ResearchConfig::builder()
            .generation_keys(["k1", "k2"])
            .build()
            .unwrap();
        let r = resolver(config, market_valid_for(&[]), empty_search(), Some(generator));
        assert_eq!(r.resolve("Empresa Desconhecida").await, NO_TICKER);
    }

    #[tokio::test]
    async fn test_ai_quota_rotates_keys() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|_, key| key == "k1")
            .times(1)
            .returning(|_, _| Err(GenerationError::QuotaExceeded("429".to_string())));
        generator
            .expect_generate()
            .withf(|_, key| key == "k2")
            .times(1)
            .returning(|_, _| Ok("Resposta: CASH3".to_string()));

        let config = ResearchConfig::builder()
            .generation_keys(["k1", "k2"])
            .build()
            .unwrap();
        let r = resolver(
            config,
            market_valid_for(&["CASH3.SA"]),
            empty_search(),
            Some(generator),
        );
        assert_eq!(r.resolve("Méliuz").await, "CASH3.SA");
    }

    #[tokio::test]
    async fn test_ai_rotates_past_a_revoked_key() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|_, key| key == "k1")
            .times(1)
            .returning(|_, _| Err(GenerationError::Fatal("403 key revoked".to_string())));
        generator
            .expect_generate()
            .withf(|_, key| key == "k2")
            .times(1)
            .returning(|_, _| Ok("CASH3".to_string()));

        let config = ResearchConfig::builder()
            .generation_keys(["k1", "k2"])
            .build()
            .unwrap();
        let r = resolver(
            config,
            market_valid_for(&["CASH3.SA"]),
            empty_search(),
            Some(generator),
        );
        assert_eq!(r.resolve("Méliuz").await, "CASH3.SA");
    }

    #[tokio::test]
    async fn test_heuristic_guess_is_validated() {
        let r = resolver(
            ResearchConfig::default(),
            market_valid_for(&["NATU3.SA"]),
            empty_search(),
            None,
        );
        let resolved = r.resolve_detailed("Natura").await.unwrap();
        assert_eq!(resolved.ticker, "NATU3.SA");
        assert_eq!(resolved.strategy, Strategy::Heuristic);
    }

    #[tokio::test]
    async fn test_unvalidated_candidates_are_never_returned() {
        let mut search = MockSearchProvider::new();
        search.expect_search().returning(|_, _| {
            Ok(vec![Candidate::new(
                "ABCD3 ABCD4 cotação",
                "https://x.com",
                "ABCD11",
            )])
        });

        let r = resolver(ResearchConfig::default(), market_valid_for(&[]), search, None);
        assert_eq!(r.resolve("ABCD3 Holding").await, NO_TICKER);
    }

    #[tokio::test]
    async fn test_stage_writes_ticker() {
        let r = resolver(
            ResearchConfig::default(),
            MockMarketDataProvider::new(),
            MockSearchProvider::new(),
            None,
        );
        let mut state = ResearchState::new("Magazine Luiza");
        r.run(&mut state).await;
        assert_eq!(state.ticker(), Some("MGLU3.SA"));
    }
}
