//! Corporate summary and vetted news
//!
//! News candidates come from up to three search layers, each only run while
//! the pool is still short. Pooled URLs are unique and pass structural
//! filters; only those answering a reachability check may reach the report.

use crate::api::{Candidate, LinkChecker, Recency, SearchOptions, SearchProvider, TextGenerator};
use crate::config::ResearchConfig;
use crate::pipeline::Stage;
use crate::prompts::{self, Labels};
use crate::rotation::{self, OnReject, RotationPolicy};
use crate::state::{NO_TICKER, ResearchState};
use async_trait::async_trait;
use olimpia_prompt::PromptRegistry;
use olimpia_utils::{fold_accents, truncate_chars};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use url::Url;

const NEWS_SITES: &str = "site:br.investing.com OR site:infomoney.com.br OR site:valor.globo.com \
                          OR site:braziljournal.com OR site:moneytimes.com.br";
const FINANCIAL_KEYWORDS: &str = "lucro OR resultado OR recomendação OR dividendo";

/// Domains that never make it into the pool
const BLOCKED_DOMAINS: &[&str] = &[
    "reclameaqui.com.br",
    "consumidor.gov.br",
    "expressmag.com.br",
];

/// Listing pages rather than articles
const BLOCKED_PATHS: &[&str] = &["/tag/", "/cotacao/"];

/// Accent-folded, lowercase
const KEYWORD_STEMS: &[&str] = &[
    "lucro",
    "resultado",
    "recomendacao",
    "dividend",
    "balanco",
    "receita",
    "earnings",
    "results",
    "recommendation",
];

static CURATED_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[*-]\s*\*\*\[(?P<title>[^\]]+)\]\((?P<url>[^)\s]+)\)\*\*")
        .expect("valid curated item regex")
});

/// Output of the collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub summary: String,
    pub news: String,
}

/// One entry of the news block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub synopsis: String,
}

impl NewsItem {
    pub fn render(&self) -> String {
        format!(
            "* **[{}]({})**\n  > {}",
            self.title, self.url, self.synopsis
        )
    }
}

/// Render items as the news block
pub fn render_news(items: &[NewsItem]) -> String {
    items
        .iter()
        .map(NewsItem::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Headline without its trailing " - Site" or " | Site" part
pub fn mechanical_title(title: &str) -> String {
    let head = title.split(" - ").next().unwrap_or(title);
    let head = head.split(" | ").next().unwrap_or(head);
    head.trim().to_string()
}

/// Domain slug of the company's own site, e.g. `lojasrenner`
pub fn official_slug(company: &str) -> String {
    fold_accents(company)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
}

/// Deduplicated, filtered candidate pool
#[derive(Debug, Default)]
pub struct CandidatePool {
    items: Vec<Candidate>,
    seen: HashSet<String>,
    require_keyword: bool,
}

impl CandidatePool {
    pub fn new(require_keyword: bool) -> Self {
        Self {
            require_keyword,
            ..Self::default()
        }
    }

    /// Add a candidate unless its URL is known or a filter rejects it
    pub fn offer(&mut self, candidate: Candidate) -> bool {
        if candidate.url.is_empty() || self.seen.contains(&candidate.url) {
            return false;
        }
        if !passes_filters(&candidate, self.require_keyword) {
            return false;
        }
        self.seen.insert(candidate.url.clone());
        self.items.push(candidate);
        true
    }

    pub fn extend(&mut self, candidates: impl IntoIterator<Item = Candidate>) -> usize {
        candidates
            .into_iter()
            .map(|c| self.offer(c))
            .filter(|added| *added)
            .count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Candidate] {
        &self.items
    }
}

fn passes_filters(candidate: &Candidate, require_keyword: bool) -> bool {
    let url = candidate.url.to_lowercase();
    if BLOCKED_PATHS.iter().any(|p| url.contains(p)) {
        return false;
    }

    let host = Url::parse(&url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    if BLOCKED_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    {
        return false;
    }

    if require_keyword {
        let text = fold_accents(&format!("{} {}", candidate.title, candidate.snippet)).to_lowercase();
        return KEYWORD_STEMS.iter().any(|k| text.contains(k));
    }
    true
}

/// Parse a curation reply into items
///
/// Returns `None` unless at least `required` items were found and every one
/// of them links to a validated candidate.
pub fn parse_curated(reply: &str, validated: &[Candidate], required: usize) -> Option<Vec<NewsItem>> {
    let allowed: HashSet<&str> = validated.iter().map(|c| c.url.as_str()).collect();
    let mut items: Vec<NewsItem> = Vec::new();

    for line in reply.lines() {
        if let Some(caps) = CURATED_ITEM.captures(line) {
            items.push(NewsItem {
                title: caps["title"].trim().to_string(),
                url: caps["url"].trim().to_string(),
                synopsis: String::new(),
            });
        } else if let Some(quote) = line.trim_start().strip_prefix('>') {
            if let Some(last) = items.last_mut().filter(|i| i.synopsis.is_empty()) {
                last.synopsis = quote.trim().to_string();
            }
        }
    }

    let mut seen = HashSet::new();
    items.retain(|i| seen.insert(i.url.clone()));

    if items.len() < required {
        return None;
    }
    if let Some(bad) = items.iter().find(|i| !allowed.contains(i.url.as_str())) {
        debug!(url = %bad.url, "Curated item links outside the validated pool");
        return None;
    }

    items.truncate(required);
    for item in &mut items {
        if item.synopsis.is_empty() {
            item.synopsis = item.title.clone();
        }
    }
    Some(items)
}

/// Gathers the corporate summary and the news block
pub struct EvidenceCollector {
    config: Arc<ResearchConfig>,
    search: Arc<dyn SearchProvider>,
    links: Arc<dyn LinkChecker>,
    generator: Option<Arc<dyn TextGenerator>>,
    prompts: Arc<PromptRegistry>,
}

impl EvidenceCollector {
    pub fn new(
        config: Arc<ResearchConfig>,
        search: Arc<dyn SearchProvider>,
        links: Arc<dyn LinkChecker>,
        generator: Option<Arc<dyn TextGenerator>>,
        prompts: Arc<PromptRegistry>,
    ) -> Self {
        Self {
            config,
            search,
            links,
            generator,
            prompts,
        }
    }

    fn labels(&self) -> &'static Labels {
        Labels::for_language(&self.config.language)
    }

    fn options(&self, max: usize) -> SearchOptions {
        SearchOptions::new()
            .region(self.config.search_region.clone())
            .max_results(max)
    }

    /// Summary and news block; placeholders stand in for anything missing
    pub async fn collect(&self, company: &str, ticker: &str) -> Evidence {
        let symbol = bare_symbol(ticker, &self.config.market_suffix);

        let summary = self.summary(company, symbol.as_deref()).await;
        let pool = self.build_pool(company, symbol.as_deref()).await;
        let validated = self.validate(pool.items(), self.config.max_link_checks).await;

        let validated = if validated.is_empty() {
            warn!("No reachable candidates, running the emergency query");
            self.emergency(company).await
        } else {
            validated
        };

        if validated.is_empty() {
            warn!(company, "No relevant news survived validation");
            return Evidence {
                summary,
                news: self.labels().no_news.to_string(),
            };
        }

        let items = match self.curate(company, symbol.as_deref(), &validated).await {
            Some(items) => items,
            None => {
                info!("Using mechanical news selection");
                self.mechanical(&validated)
            }
        };

        Evidence {
            summary,
            news: render_news(&items),
        }
    }

    async fn summary(&self, company: &str, symbol: Option<&str>) -> String {
        let query = match symbol {
            Some(s) => format!("{company} {s} ri institucional"),
            None => format!("{company} ri institucional"),
        };

        match self.search.search(&query, &self.options(2)).await {
            Ok(hits) => {
                let lines: Vec<String> = hits
                    .iter()
                    .filter(|h| !h.snippet.trim().is_empty())
                    .map(|h| format!("- {}", h.snippet.trim()))
                    .collect();
                if lines.is_empty() {
                    self.labels().no_summary.to_string()
                } else {
                    lines.join("\n")
                }
            }
            Err(e) => {
                warn!(error = %e, "Summary search failed");
                self.labels().no_summary.to_string()
            }
        }
    }

    /// Run the search layers into a pool
    pub async fn build_pool(&self, company: &str, symbol: Option<&str>) -> CandidatePool {
        let mut pool = CandidatePool::new(self.config.require_financial_keyword);
        let per_layer = self.config.layer_max_results;
        let anchor = format!("\"{}\"", symbol.unwrap_or(company));

        let layer_a = format!("{NEWS_SITES} {anchor} {FINANCIAL_KEYWORDS}");
        self.run_layer(
            &mut pool,
            "A",
            &layer_a,
            self.options(per_layer).recency(Recency::Month),
        )
        .await;

        if pool.len() < self.config.pool_target_primary {
            let layer_b = format!("{NEWS_SITES} \"{company}\"");
            self.run_layer(
                &mut pool,
                "B",
                &layer_b,
                self.options(per_layer).recency(Recency::Year),
            )
            .await;
        }

        if pool.len() < self.config.pool_target_secondary {
            let slug = official_slug(company);
            let layer_c = format!(
                "\"{company}\" ações mercado financeiro -site:{slug}.com.br -site:reclameaqui.com.br \
                 -site:consumidor.gov.br -site:expressmag.com.br"
            );
            self.run_layer(&mut pool, "C", &layer_c, self.options(per_layer))
                .await;
        }

        debug!(pool = pool.len(), "Candidate pool built");
        pool
    }

    async fn run_layer(
        &self,
        pool: &mut CandidatePool,
        layer: &str,
        query: &str,
        options: SearchOptions,
    ) {
        match self.search.search(query, &options).await {
            Ok(hits) => {
                let added = pool.extend(hits);
                debug!(layer, added, "Search layer merged");
            }
            Err(e) => warn!(layer, error = %e, "Search layer failed"),
        }
    }

    /// Reachability check over the first `cap` candidates, in order
    async fn validate(&self, candidates: &[Candidate], cap: usize) -> Vec<Candidate> {
        let mut validated = Vec::new();
        for candidate in candidates.iter().take(cap) {
            if self
                .links
                .exists(&candidate.url, self.config.link_timeout)
                .await
            {
                validated.push(candidate.clone());
            } else {
                debug!(url = %candidate.url, "Dropping unreachable candidate");
            }
        }
        validated
    }

    async fn emergency(&self, company: &str) -> Vec<Candidate> {
        let cap = self.config.emergency_link_checks;
        let query = format!("\"{company}\" notícias");
        let hits = match self
            .search
            .search(&query, &self.options(cap).recency(Recency::Year))
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Emergency search failed");
                return Vec::new();
            }
        };

        let mut pool = CandidatePool::new(false);
        pool.extend(hits);
        self.validate(pool.items(), cap).await
    }

    async fn curate(
        &self,
        company: &str,
        symbol: Option<&str>,
        validated: &[Candidate],
    ) -> Option<Vec<NewsItem>> {
        let generator = self.generator.as_ref()?;
        let required = self.config.max_news_items;
        if !self.config.has_generation() || validated.len() < required {
            return None;
        }

        let prompt = self
            .prompts
            .render_with_lang(
                prompts::CURATION,
                &self.config.language,
                &json!({
                    "company": company,
                    "ticker": symbol.unwrap_or(NO_TICKER),
                    "count": required,
                    "candidates": validated,
                }),
            )
            .map_err(|e| warn!(error = %e, "Curation prompt failed to render"))
            .ok()?;

        let policy = RotationPolicy::default()
            .with_on_reject(OnReject::Continue)
            .with_final_wait(self.config.final_quota_wait);
        rotation::rotate(
            generator.as_ref(),
            &prompt,
            &self.config.generation_keys,
            policy,
            |reply| parse_curated(reply, validated, required),
        )
        .await
        .accepted()
    }

    fn mechanical(&self, validated: &[Candidate]) -> Vec<NewsItem> {
        validated
            .iter()
            .take(self.config.max_news_items)
            .map(|c| {
                let title = mechanical_title(&c.title);
                let synopsis = if c.snippet.trim().is_empty() {
                    title.clone()
                } else {
                    truncate_chars(&c.snippet, self.config.snippet_max_chars)
                };
                NewsItem {
                    title,
                    url: c.url.clone(),
                    synopsis,
                }
            })
            .collect()
    }
}

/// Ticker without its market suffix; `None` for the sentinel
fn bare_symbol(ticker: &str, suffix: &str) -> Option<String> {
    let ticker = ticker.trim();
    if ticker.is_empty() || ticker == NO_TICKER {
        return None;
    }
    Some(ticker.strip_suffix(suffix).unwrap_or(ticker).to_string())
}

#[async_trait]
impl Stage for EvidenceCollector {
    fn name(&self) -> &'static str {
        "evidence_collector"
    }

    async fn run(&self, state: &mut ResearchState) {
        let evidence = self
            .collect(state.company_name(), state.ticker_or_sentinel())
            .await;
        state.set_evidence(evidence.summary, evidence.news);
    }
}
