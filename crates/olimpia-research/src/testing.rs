//! In-memory capability fakes for end-to-end tests
//!
//! Unlike the mockall mocks these keep behaviour in data, which reads better
//! when a whole pipeline run is scripted.

use crate::api::{
    Candidate, DividendEvent, InfoFields, LinkChecker, MarketDataProvider, Period, PriceBar,
    SearchOptions, SearchProvider, TextGenerator,
};
use crate::error::{GenerationError, ResearchError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Search fake answering by query substring
///
/// The first rule whose needle appears in the query wins; other queries get
/// no hits. Every query is recorded.
#[derive(Debug, Default)]
pub struct FakeSearch {
    rules: Vec<(String, Vec<Candidate>)>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needle: impl Into<String>, hits: Vec<Candidate>) -> Self {
        self.rules.push((needle.into(), hits));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<Candidate>> {
        lock(&self.queries).push(query.to_string());
        let hits = self
            .rules
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, hits)| hits.clone())
            .unwrap_or_default();
        Ok(match options.max_results {
            Some(max) => hits.into_iter().take(max).collect(),
            None => hits,
        })
    }
}

/// Everything the market fake knows about one ticker
#[derive(Debug, Clone, Default)]
pub struct FakeQuote {
    pub latest: Option<f64>,
    pub nominal: Vec<PriceBar>,
    pub adjusted: Vec<PriceBar>,
    pub dividends: Vec<DividendEvent>,
    pub info: InfoFields,
}

/// Market fake; unknown tickers have empty data rather than errors
#[derive(Debug, Default)]
pub struct FakeMarket {
    quotes: HashMap<String, FakeQuote>,
    calls: Mutex<usize>,
}

impl FakeMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, ticker: impl Into<String>, quote: FakeQuote) -> Self {
        self.quotes.insert(ticker.into(), quote);
        self
    }

    /// Number of provider calls so far
    pub fn calls(&self) -> usize {
        *lock(&self.calls)
    }

    fn quote(&self, ticker: &str) -> FakeQuote {
        *lock(&self.calls) += 1;
        self.quotes.get(ticker).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl MarketDataProvider for FakeMarket {
    async fn latest_price(&self, ticker: &str) -> Result<Option<f64>> {
        Ok(self.quote(ticker).latest)
    }

    async fn price_history(
        &self,
        ticker: &str,
        _period: Period,
        adjusted: bool,
    ) -> Result<Vec<PriceBar>> {
        let quote = self.quote(ticker);
        Ok(if adjusted { quote.adjusted } else { quote.nominal })
    }

    async fn dividends(&self, ticker: &str) -> Result<Vec<DividendEvent>> {
        Ok(self.quote(ticker).dividends)
    }

    async fn info(&self, ticker: &str) -> Result<InfoFields> {
        if self.quotes.contains_key(ticker) {
            Ok(self.quote(ticker).info)
        } else {
            Err(ResearchError::market(ticker, "unknown ticker"))
        }
    }
}

/// Link fake; every URL is reachable unless marked dead
#[derive(Debug, Default)]
pub struct FakeLinks {
    dead: HashSet<String>,
    checked: Mutex<Vec<String>>,
}

impl FakeLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dead(mut self, url: impl Into<String>) -> Self {
        self.dead.insert(url.into());
        self
    }

    pub fn checked(&self) -> Vec<String> {
        lock(&self.checked).clone()
    }
}

#[async_trait]
impl LinkChecker for FakeLinks {
    async fn exists(&self, url: &str, _timeout: Duration) -> bool {
        lock(&self.checked).push(url.to_string());
        !self.dead.contains(url)
    }
}

/// Generator fake replaying a script
///
/// Replies are consumed in order; an exhausted script fails fatally.
#[derive(Debug, Default)]
pub struct FakeGenerator {
    script: Mutex<VecDeque<std::result::Result<String, GenerationError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        lock(&self.script).push_back(Ok(text.into()));
        self
    }

    pub fn quota(self) -> Self {
        lock(&self.script).push_back(Err(GenerationError::QuotaExceeded(
            "429 RESOURCE_EXHAUSTED".to_string(),
        )));
        self
    }

    pub fn fail(self, reason: impl Into<String>) -> Self {
        lock(&self.script).push_back(Err(GenerationError::Fatal(reason.into())));
        self
    }

    /// `(prompt, credential)` of every call
    pub fn calls(&self) -> Vec<(String, String)> {
        lock(&self.calls).clone()
    }

    pub fn credentials_used(&self) -> Vec<String> {
        self.calls().into_iter().map(|(_, key)| key).collect()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(
        &self,
        prompt: &str,
        credential: &str,
    ) -> std::result::Result<String, GenerationError> {
        lock(&self.calls).push((prompt.to_string(), credential.to_string()));
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Fatal("script exhausted".to_string())))
    }
}
