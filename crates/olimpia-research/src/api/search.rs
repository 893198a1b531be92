//! Search capability and the backend-agnostic candidate record

use crate::api::duckduckgo::DuckDuckGoSearch;
use crate::api::google::GoogleCustomSearch;
use crate::config::ResearchConfig;
use crate::error::{ResearchError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One search hit, normalised across backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl Candidate {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

/// Publication window of a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recency {
    Day,
    Week,
    Month,
    Year,
}

impl Recency {
    /// Letter code of the keyless backend (`df=`)
    pub fn letter(self) -> &'static str {
        match self {
            Recency::Day => "d",
            Recency::Week => "w",
            Recency::Month => "m",
            Recency::Year => "y",
        }
    }

    /// Restriction code of the authenticated backend (`dateRestrict=`)
    pub fn date_restrict(self) -> &'static str {
        match self {
            Recency::Day => "d1",
            Recency::Week => "w1",
            Recency::Month => "m1",
            Recency::Year => "y1",
        }
    }
}

/// Per-query search options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub region: Option<String>,
    pub max_results: Option<usize>,
    pub recency: Option<Recency>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    pub fn recency(mut self, recency: Recency) -> Self {
        self.recency = Some(recency);
        self
    }
}

/// Full-text web search
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<Candidate>>;
}

/// The configured search backend
pub enum SearchBackend {
    DuckDuckGo(DuckDuckGoSearch),
    Google(GoogleCustomSearch),
}

impl SearchBackend {
    /// Google when both of its credentials are configured, keyless otherwise
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        match (&config.google_api_key, &config.google_cse_id) {
            (Some(key), Some(cx)) => Ok(Self::Google(GoogleCustomSearch::new(
                key,
                cx,
                config.request_timeout,
            )?)),
            (None, None) => Ok(Self::DuckDuckGo(DuckDuckGoSearch::new(
                config.search_rate_limit_per_minute,
                config.request_timeout,
            )?)),
            _ => Err(ResearchError::Config(
                "GOOGLE_API_KEY and GOOGLE_CSE_ID must be set together".to_string(),
            )),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::DuckDuckGo(_) => "duckduckgo",
            Self::Google(_) => "google",
        }
    }
}

#[async_trait]
impl SearchProvider for SearchBackend {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<Candidate>> {
        match self {
            Self::DuckDuckGo(ddg) => ddg.search(query, options).await,
            Self::Google(google) => google.search(query, options).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recency_codes() {
        assert_eq!(Recency::Month.letter(), "m");
        assert_eq!(Recency::Year.date_restrict(), "y1");
    }

    #[test]
    fn test_options_builder() {
        let opts = SearchOptions::new()
            .region("br-pt")
            .max_results(5)
            .recency(Recency::Week);
        assert_eq!(opts.region.as_deref(), Some("br-pt"));
        assert_eq!(opts.max_results, Some(5));
        assert_eq!(opts.recency, Some(Recency::Week));
    }

    #[test]
    fn test_backend_selection() {
        let keyless = SearchBackend::from_config(&ResearchConfig::default()).unwrap();
        assert_eq!(keyless.backend_name(), "duckduckgo");

        let config = ResearchConfig::builder()
            .google_search("key", "cx")
            .build()
            .unwrap();
        let google = SearchBackend::from_config(&config).unwrap();
        assert_eq!(google.backend_name(), "google");
    }
}
