//! Configuration for research runs
//!
//! Every component receives the configuration at construction. Nothing below
//! this module reads the process environment.

use crate::error::{ResearchError, Result};
use olimpia_prompt::Language;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one research pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Text-generation credentials, tried in order
    pub generation_keys: Vec<String>,

    /// Generation model identifier
    pub model: String,

    /// Sampling temperature for the report and news curation
    pub report_temperature: f32,

    /// Sampling temperature for ticker lookup
    pub ticker_temperature: f32,

    /// Google Custom Search API key (optional)
    pub google_api_key: Option<String>,

    /// Google Custom Search engine id (optional)
    pub google_cse_id: Option<String>,

    /// Keyless search region code
    pub search_region: String,

    /// Report language
    pub language: Language,

    /// Per-link timeout of the reachability check
    pub link_timeout: Duration,

    /// How many pooled candidates get a reachability check
    pub max_link_checks: usize,

    /// How many emergency-query hits get a reachability check
    pub emergency_link_checks: usize,

    /// Pool size below which Layer B runs
    pub pool_target_primary: usize,

    /// Pool size below which Layer C runs
    pub pool_target_secondary: usize,

    /// Results requested per search layer
    pub layer_max_results: usize,

    /// News items in the final block
    pub max_news_items: usize,

    /// Snippet length in the mechanical news block
    pub snippet_max_chars: usize,

    /// Drop candidates whose title and snippet carry no financial keyword
    pub require_financial_keyword: bool,

    /// Yields above this are already percentages
    pub dividend_scale_threshold: f64,

    /// Prices at or below this are bad ticks
    pub degenerate_price_floor: f64,

    /// Prefix of every rendered price
    pub currency_prefix: String,

    /// Exchange suffix appended to bare symbols
    pub market_suffix: String,

    /// Share class used by the heuristic guess
    pub default_share_class: char,

    /// Capped wait before one last attempt when every key hit its quota
    pub final_quota_wait: Option<Duration>,

    /// Keyless search requests allowed per minute
    pub search_rate_limit_per_minute: u32,

    /// Lifetime of cached market-data responses
    pub market_cache_ttl: Duration,

    /// Timeout of search and market-data requests
    pub request_timeout: Duration,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            generation_keys: Vec::new(),
            model: "gemini-2.5-flash".to_string(),
            report_temperature: 0.1,
            ticker_temperature: 0.0,
            google_api_key: None,
            google_cse_id: None,
            search_region: "br-pt".to_string(),
            language: Language::English,
            link_timeout: Duration::from_secs(2),
            max_link_checks: 10,
            emergency_link_checks: 5,
            pool_target_primary: 5,
            pool_target_secondary: 8,
            layer_max_results: 5,
            max_news_items: 3,
            snippet_max_chars: 220,
            require_financial_keyword: false,
            dividend_scale_threshold: 0.6,
            degenerate_price_floor: 0.01,
            currency_prefix: "R$ ".to_string(),
            market_suffix: ".SA".to_string(),
            default_share_class: '3',
            final_quota_wait: None,
            search_rate_limit_per_minute: 30,
            market_cache_ttl: Duration::from_secs(300),
            request_timeout: Duration::from_secs(20),
        }
    }
}

/// Split a comma-separated credential list, dropping blanks
pub fn parse_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

impl ResearchConfig {
    /// Create a new configuration builder
    pub fn builder() -> ResearchConfigBuilder {
        ResearchConfigBuilder::default()
    }

    /// Defaults overlaid with `GEMINI_API_KEY`, `GEMINI_MODEL`,
    /// `GOOGLE_API_KEY`, `GOOGLE_CSE_ID` and `OLIMPIA_LANGUAGE`
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with an arbitrary variable source
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let present = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(keys) = present("GEMINI_API_KEY") {
            config.generation_keys = parse_keys(&keys);
        }
        if let Some(model) = present("GEMINI_MODEL") {
            config.model = model.trim().to_string();
        }
        config.google_api_key = present("GOOGLE_API_KEY");
        config.google_cse_id = present("GOOGLE_CSE_ID");
        if let Some(lang) = present("OLIMPIA_LANGUAGE") {
            config.language = Language::from_code(&lang);
        }

        config
    }

    /// Whether any generation credential is configured
    pub fn has_generation(&self) -> bool {
        !self.generation_keys.is_empty()
    }

    /// Whether the authenticated search backend is configured
    pub fn has_google_search(&self) -> bool {
        self.google_api_key.is_some() && self.google_cse_id.is_some()
    }

    /// Reject configurations that cannot run
    pub fn validate(&self) -> Result<()> {
        if self.link_timeout.is_zero() {
            return Err(ResearchError::Config(
                "link_timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_news_items == 0 {
            return Err(ResearchError::Config(
                "max_news_items must be greater than 0".to_string(),
            ));
        }

        if self.pool_target_primary > self.pool_target_secondary {
            return Err(ResearchError::Config(format!(
                "pool_target_primary ({}) exceeds pool_target_secondary ({})",
                self.pool_target_primary, self.pool_target_secondary
            )));
        }

        if self.dividend_scale_threshold <= 0.0 || self.dividend_scale_threshold.is_nan() {
            return Err(ResearchError::Config(
                "dividend_scale_threshold must be positive".to_string(),
            ));
        }

        if self.google_api_key.is_some() != self.google_cse_id.is_some() {
            return Err(ResearchError::Config(
                "GOOGLE_API_KEY and GOOGLE_CSE_ID must be set together".to_string(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(ResearchError::Config("model must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Builder for ResearchConfig
#[derive(Debug, Default)]
pub struct ResearchConfigBuilder {
    generation_keys: Option<Vec<String>>,
    model: Option<String>,
    google: Option<(String, String)>,
    language: Option<Language>,
    link_timeout: Option<Duration>,
    max_link_checks: Option<usize>,
    max_news_items: Option<usize>,
    require_financial_keyword: Option<bool>,
    dividend_scale_threshold: Option<f64>,
    final_quota_wait: Option<Duration>,
    market_cache_ttl: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl ResearchConfigBuilder {
    /// Set the generation credentials
    pub fn generation_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generation_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Set the generation model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Use Google Custom Search instead of the keyless backend
    pub fn google_search(mut self, api_key: impl Into<String>, cse_id: impl Into<String>) -> Self {
        self.google = Some((api_key.into(), cse_id.into()));
        self
    }

    /// Set the report language
    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Set the per-link reachability timeout
    pub fn link_timeout(mut self, timeout: Duration) -> Self {
        self.link_timeout = Some(timeout);
        self
    }

    /// Set the reachability check budget
    pub fn max_link_checks(mut self, checks: usize) -> Self {
        self.max_link_checks = Some(checks);
        self
    }

    /// Set how many news items end up in the report
    pub fn max_news_items(mut self, items: usize) -> Self {
        self.max_news_items = Some(items);
        self
    }

    /// Require a financial keyword in every candidate
    pub fn require_financial_keyword(mut self, required: bool) -> Self {
        self.require_financial_keyword = Some(required);
        self
    }

    /// Set the dividend-yield scale threshold
    pub fn dividend_scale_threshold(mut self, threshold: f64) -> Self {
        self.dividend_scale_threshold = Some(threshold);
        self
    }

    /// Wait this long and retry once when every key is quota-limited
    pub fn final_quota_wait(mut self, wait: Duration) -> Self {
        self.final_quota_wait = Some(wait);
        self
    }

    /// Set the market-data cache lifetime
    pub fn market_cache_ttl(mut self, ttl: Duration) -> Self {
        self.market_cache_ttl = Some(ttl);
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ResearchConfig> {
        let defaults = ResearchConfig::default();
        let (google_api_key, google_cse_id) = match self.google {
            Some((key, cx)) => (Some(key), Some(cx)),
            None => (None, None),
        };

        let config = ResearchConfig {
            generation_keys: self.generation_keys.unwrap_or(defaults.generation_keys),
            model: self.model.unwrap_or(defaults.model),
            google_api_key,
            google_cse_id,
            language: self.language.unwrap_or(defaults.language),
            link_timeout: self.link_timeout.unwrap_or(defaults.link_timeout),
            max_link_checks: self.max_link_checks.unwrap_or(defaults.max_link_checks),
            max_news_items: self.max_news_items.unwrap_or(defaults.max_news_items),
            require_financial_keyword: self
                .require_financial_keyword
                .unwrap_or(defaults.require_financial_keyword),
            dividend_scale_threshold: self
                .dividend_scale_threshold
                .unwrap_or(defaults.dividend_scale_threshold),
            final_quota_wait: self.final_quota_wait.or(defaults.final_quota_wait),
            market_cache_ttl: self.market_cache_ttl.unwrap_or(defaults.market_cache_ttl),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}
