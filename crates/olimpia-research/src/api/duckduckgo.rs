//! Keyless web search over the DuckDuckGo HTML endpoint

use crate::api::search::{Candidate, SearchOptions, SearchProvider};
use crate::error::{ResearchError, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use olimpia_utils::{decode_entities, strip_tags};
use regex::Regex;
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

static RESULT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a([^>]*class="[^"]*result__a[^"]*"[^>]*)>(.*?)</a>"#)
        .expect("valid result link regex")
});
static RESULT_SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="[^"]*result__snippet[^"]*"[^>]*>(.*?)</(?:a|div|td)>"#)
        .expect("valid snippet regex")
});
static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).expect("valid href regex"));

/// Search client for the keyless backend
pub struct DuckDuckGoSearch {
    client: Client,
    rate_limiter: SharedRateLimiter,
}

impl DuckDuckGoSearch {
    /// Create a client allowing `rate_limit` requests per minute
    pub fn new(rate_limit: u32, timeout: Duration) -> Result<Self> {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    #[instrument(skip(self, options), fields(backend = "duckduckgo"))]
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<Candidate>> {
        self.rate_limiter.until_ready().await;

        let mut params = vec![("q", query.to_string())];
        if let Some(region) = &options.region {
            params.push(("kl", region.clone()));
        }
        if let Some(recency) = options.recency {
            params.push(("df", recency.letter().to_string()));
        }

        let response = self
            .client
            .post(ENDPOINT)
            .form(&params)
            .send()
            .await
            .map_err(|e| ResearchError::Search(format!("DuckDuckGo request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(ResearchError::Search(format!(
                "DuckDuckGo returned HTTP {status}"
            )));
        }

        let html = response.text().await?;
        let mut hits = parse_results(&html);
        if let Some(max) = options.max_results {
            hits.truncate(max);
        }

        debug!(hits = hits.len(), "DuckDuckGo search done");
        Ok(hits)
    }
}

/// A result anchor before normalisation
struct RawHit {
    href: String,
    title_html: String,
    snippet_html: String,
}

impl RawHit {
    /// Normalise into a candidate; `None` for ads and untitled anchors
    fn into_candidate(self) -> Option<Candidate> {
        let url = resolve_href(&decode_entities(&self.href))?;
        let title = decode_entities(&strip_tags(&self.title_html))
            .trim()
            .to_string();
        let snippet = decode_entities(&strip_tags(&self.snippet_html))
            .trim()
            .to_string();
        if title.is_empty() {
            return None;
        }
        Some(Candidate { title, url, snippet })
    }
}

/// Extract candidates from a result page, in page order
pub(crate) fn parse_results(html: &str) -> Vec<Candidate> {
    let anchors: Vec<_> = RESULT_LINK.captures_iter(html).collect();
    let mut out = Vec::with_capacity(anchors.len());

    for (i, caps) in anchors.iter().enumerate() {
        let (Some(whole), Some(attrs), Some(title)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let Some(href) = HREF.captures(attrs.as_str()).and_then(|c| c.get(1)) else {
            continue;
        };

        // The snippet belongs to this hit if it appears before the next anchor
        let section_end = anchors
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(html.len(), |m| m.start());
        let section = &html[whole.end()..section_end];
        let snippet_html = RESULT_SNIPPET
            .captures(section)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let raw = RawHit {
            href: href.as_str().to_string(),
            title_html: title.as_str().to_string(),
            snippet_html,
        };
        if let Some(candidate) = raw.into_candidate() {
            out.push(candidate);
        }
    }

    out
}

/// Turn a result href into the target URL
///
/// Organic results point at `/l/?uddg=<target>`; ads point back into
/// duckduckgo.com and are dropped.
fn resolve_href(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;
    let target = match parsed.query_pairs().find(|(k, _)| k == "uddg") {
        Some((_, v)) => Url::parse(&v).ok()?,
        None => parsed,
    };

    if !matches!(target.scheme(), "http" | "https") {
        return None;
    }
    if target
        .host_str()
        .is_some_and(|h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"))
    {
        return None;
    }
    Some(target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.infomoney.com.br%2Fmercados%2Fvale%2Dlucro%2F&amp;rut=abc">Vale tem <b>lucro</b> de R$ 10 bi &amp; paga dividendos</a>
  </h2>
  <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">A mineradora <b>Vale</b> reportou lucro...</a>
</div>
<div class="result results_links result--ad">
  <a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_domain=x">Anúncio</a>
  <a class="result__snippet" href="#">Compre agora</a>
</div>
<div class="result">
  <a rel="nofollow" class="result__a" href="https://valor.globo.com/empresas/noticia/vale.ghtml">Vale no Valor</a>
</div>
"##;

    #[test]
    fn test_parse_results() {
        let hits = parse_results(PAGE);
        assert_eq!(hits.len(), 2);

        assert_eq!(
            hits[0].title,
            "Vale tem lucro de R$ 10 bi & paga dividendos"
        );
        assert_eq!(
            hits[0].url,
            "https://www.infomoney.com.br/mercados/vale-lucro/"
        );
        assert_eq!(hits[0].snippet, "A mineradora Vale reportou lucro...");

        assert_eq!(
            hits[1].url,
            "https://valor.globo.com/empresas/noticia/vale.ghtml"
        );
        assert!(hits[1].snippet.is_empty());
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(
            resolve_href("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa&rut=1").as_deref(),
            Some("https://example.com/a")
        );
        assert!(resolve_href("https://duckduckgo.com/y.js?ad=1").is_none());
        assert!(resolve_href("javascript:void(0)").is_none());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_live_search() {
        let ddg = DuckDuckGoSearch::new(30, Duration::from_secs(20)).unwrap();
        let hits = ddg
            .search(
                "Petrobras PETR4 dividendos",
                &SearchOptions::new().region("br-pt").max_results(5),
            )
            .await
            .unwrap();
        assert!(hits.len() <= 5);
    }
}
