//! Link reachability checks

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Whether a URL currently answers without an error status
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkChecker: Send + Sync {
    async fn exists(&self, url: &str, timeout: Duration) -> bool;
}

/// GET-based checker: any status below 400 counts as existing
pub struct HttpLinkChecker {
    client: Client,
}

impl HttpLinkChecker {
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LinkChecker for HttpLinkChecker {
    #[instrument(skip(self))]
    async fn exists(&self, url: &str, timeout: Duration) -> bool {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => {
                let status = response.status();
                debug!(%status, "Link checked");
                status.as_u16() < 400
            }
            Err(e) => {
                debug!(error = %e, "Link unreachable");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_does_not_exist() {
        let checker = HttpLinkChecker::new().unwrap();
        assert!(!checker.exists("not a url", Duration::from_millis(200)).await);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_live_link() {
        let checker = HttpLinkChecker::new().unwrap();
        assert!(checker.exists("https://www.b3.com.br/", Duration::from_secs(5)).await);
    }
}
