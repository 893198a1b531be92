//! Authenticated search over the Google Custom Search JSON API

use crate::api::search::{Candidate, SearchOptions, SearchProvider};
use crate::error::{ResearchError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// The API returns at most ten items per page
const MAX_PAGE: usize = 10;

/// Google Custom Search client
pub struct GoogleCustomSearch {
    client: Client,
    api_key: String,
    cse_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

impl From<SearchItem> for Candidate {
    fn from(item: SearchItem) -> Self {
        Candidate {
            title: item.title.trim().to_string(),
            url: item.link,
            snippet: item.snippet.replace('\n', " ").trim().to_string(),
        }
    }
}

impl GoogleCustomSearch {
    pub fn new(api_key: &str, cse_id: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            cse_id: cse_id.to_string(),
        })
    }

    fn query_params(&self, query: &str, options: &SearchOptions) -> Vec<(&'static str, String)> {
        let num = options.max_results.unwrap_or(MAX_PAGE).clamp(1, MAX_PAGE);
        let mut params = vec![
            ("key", self.api_key.clone()),
            ("cx", self.cse_id.clone()),
            ("q", query.to_string()),
            ("num", num.to_string()),
            ("gl", "br".to_string()),
        ];
        if let Some(recency) = options.recency {
            params.push(("dateRestrict", recency.date_restrict().to_string()));
        }
        params
    }
}

#[async_trait]
impl SearchProvider for GoogleCustomSearch {
    #[instrument(skip(self, options), fields(backend = "google"))]
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<Candidate>> {
        let response = self
            .client
            .get(ENDPOINT)
            .query(&self.query_params(query, options))
            .send()
            .await
            .map_err(|e| ResearchError::Search(format!("Google request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::Search(format!(
                "Google API error {status}: {body}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Search(format!("Failed to parse Google response: {e}")))?;

        let hits: Vec<Candidate> = parsed.items.into_iter().map(Candidate::from).collect();
        debug!(hits = hits.len(), "Google search done");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::search::Recency;

    #[test]
    fn test_item_conversion() {
        let raw = r#"{"items":[{"title":" WEG sobe ","link":"https://braziljournal.com/weg","snippet":"Receita\ncresce"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let hits: Vec<Candidate> = parsed.items.into_iter().map(Candidate::from).collect();

        assert_eq!(hits[0].title, "WEG sobe");
        assert_eq!(hits[0].url, "https://braziljournal.com/weg");
        assert_eq!(hits[0].snippet, "Receita cresce");
    }

    #[test]
    fn test_empty_response() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn test_query_params() {
        let google = GoogleCustomSearch::new("k", "cx", Duration::from_secs(5)).unwrap();
        let params = google.query_params(
            "Suzano",
            &SearchOptions::new().max_results(25).recency(Recency::Month),
        );

        assert!(params.contains(&("num", "10".to_string())));
        assert!(params.contains(&("dateRestrict", "m1".to_string())));
        assert!(params.contains(&("q", "Suzano".to_string())));
    }
}
