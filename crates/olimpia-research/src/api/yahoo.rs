//! Yahoo Finance market-data adapter

use crate::api::market::{DividendEvent, InfoFields, MarketDataProvider, Period, PriceBar};
use crate::cache::{CacheKey, MarketCache};
use crate::error::{ResearchError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, instrument};
use yahoo_finance_api as yahoo;

const CHART_ENDPOINT: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Bar as downloaded, before choosing nominal or adjusted prices
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct StoredBar {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    adjclose: f64,
}

impl StoredBar {
    fn to_bar(self, adjusted: bool) -> Option<PriceBar> {
        let date = DateTime::<Utc>::from_timestamp(self.timestamp, 0)?;
        // Adjusted OHLC is the nominal bar scaled by adjclose/close
        let factor = if adjusted && self.close > 0.0 && self.adjclose.is_finite() {
            self.adjclose / self.close
        } else {
            1.0
        };
        Some(PriceBar {
            date,
            open: self.open * factor,
            high: self.high * factor,
            low: self.low * factor,
            close: self.close * factor,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredChart {
    bars: Vec<StoredBar>,
    dividends: Vec<(i64, f64)>,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    fifty_two_week_low: Option<f64>,
    fifty_two_week_high: Option<f64>,
    chart_previous_close: Option<f64>,
}

impl From<ChartMeta> for InfoFields {
    fn from(meta: ChartMeta) -> Self {
        let year_change = match (meta.regular_market_price, meta.chart_previous_close) {
            (Some(price), Some(prev)) if prev > 0.0 => Some(price / prev - 1.0),
            _ => None,
        };
        InfoFields {
            current_price: meta.regular_market_price,
            fifty_two_week_low: meta.fifty_two_week_low,
            fifty_two_week_high: meta.fifty_two_week_high,
            // The chart endpoint carries no yield; dividends fill the gap
            dividend_yield: None,
            year_change,
        }
    }
}

/// Market data from Yahoo Finance, cached per symbol and endpoint
pub struct YahooMarketData {
    connector: yahoo::YahooConnector,
    http: Client,
    cache: MarketCache,
}

impl YahooMarketData {
    pub fn new(cache_ttl: Duration, timeout: Duration) -> Result<Self> {
        let connector = yahoo::YahooConnector::new()
            .map_err(|e| ResearchError::market("*", format!("connector init failed: {e}")))?;
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            connector,
            http,
            cache: MarketCache::new(cache_ttl),
        })
    }

    async fn chart(&self, ticker: &str, period: Period) -> Result<StoredChart> {
        let key = CacheKey::new(ticker, "chart", period.days());
        let value = self
            .cache
            .get_or_fetch(key, || async move {
                let chart = self.download_chart(ticker, period).await?;
                Ok::<_, ResearchError>(serde_json::to_value(chart)?)
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn download_chart(&self, ticker: &str, period: Period) -> Result<StoredChart> {
        let end = OffsetDateTime::now_utc();
        let start = end - time::Duration::days(period.days());

        let response = self
            .connector
            .get_quote_history(ticker, start, end)
            .await
            .map_err(|e| ResearchError::market(ticker, e))?;

        let bars = response
            .quotes()
            .map_err(|e| ResearchError::market(ticker, e))?
            .iter()
            .filter_map(|q| {
                Some(StoredBar {
                    timestamp: i64::try_from(q.timestamp).ok()?,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    adjclose: q.adjclose,
                })
            })
            .collect();

        // A symbol without dividend events is not an error
        let dividends = response
            .dividends()
            .map(|divs| {
                divs.iter()
                    .filter_map(|d| Some((i64::try_from(d.date).ok()?, d.amount)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(StoredChart { bars, dividends })
    }
}

#[async_trait]
impl MarketDataProvider for YahooMarketData {
    #[instrument(skip(self))]
    async fn latest_price(&self, ticker: &str) -> Result<Option<f64>> {
        let key = CacheKey::new(ticker, "quote", "1d");
        let value = self
            .cache
            .get_or_fetch(key, || async move {
                let response = self
                    .connector
                    .get_latest_quotes(ticker, "1d")
                    .await
                    .map_err(|e| ResearchError::market(ticker, e))?;
                let price = response.last_quote().ok().map(|q| q.close);
                Ok::<_, ResearchError>(serde_json::to_value(price)?)
            })
            .await?;

        let price: Option<f64> = serde_json::from_value(value)?;
        Ok(price.filter(|p| p.is_finite() && *p > 0.0))
    }

    #[instrument(skip(self))]
    async fn price_history(
        &self,
        ticker: &str,
        period: Period,
        adjusted: bool,
    ) -> Result<Vec<PriceBar>> {
        let chart = self.chart(ticker, period).await?;
        let bars: Vec<PriceBar> = chart
            .bars
            .into_iter()
            .filter_map(|b| b.to_bar(adjusted))
            .collect();
        debug!(bars = bars.len(), "History loaded");
        Ok(bars)
    }

    #[instrument(skip(self))]
    async fn dividends(&self, ticker: &str) -> Result<Vec<DividendEvent>> {
        let chart = self.chart(ticker, Period::Year).await?;
        let mut events: Vec<DividendEvent> = chart
            .dividends
            .into_iter()
            .filter_map(|(ts, amount)| {
                Some(DividendEvent {
                    date: DateTime::<Utc>::from_timestamp(ts, 0)?,
                    amount,
                })
            })
            .collect();
        events.sort_by_key(|d| d.date);
        Ok(events)
    }

    #[instrument(skip(self))]
    async fn info(&self, ticker: &str) -> Result<InfoFields> {
        let key = CacheKey::new(ticker, "info", "1y");
        let value = self
            .cache
            .get_or_fetch(key, || async move {
                let response = self
                    .http
                    .get(format!("{CHART_ENDPOINT}/{ticker}"))
                    .query(&[("range", "1y"), ("interval", "1mo")])
                    .send()
                    .await?;
                if !response.status().is_success() {
                    return Err(ResearchError::market(
                        ticker,
                        format!("chart endpoint returned {}", response.status()),
                    ));
                }
                Ok::<_, ResearchError>(response.json::<serde_json::Value>().await?)
            })
            .await?;

        parse_info(ticker, value)
    }
}

fn parse_info(ticker: &str, value: serde_json::Value) -> Result<InfoFields> {
    let envelope: ChartEnvelope = serde_json::from_value(value)?;
    envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .map(|r| InfoFields::from(r.meta))
        .ok_or_else(|| ResearchError::market(ticker, "no chart result"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_adjusted_bar_scaling() {
        let stored = StoredBar {
            timestamp: 1_700_000_000,
            open: 10.0,
            high: 12.0,
            low: 9.0,
            close: 11.0,
            adjclose: 5.5,
        };

        let nominal = stored.to_bar(false).unwrap();
        let adjusted = stored.to_bar(true).unwrap();
        assert!((nominal.close - 11.0).abs() < 1e-9);
        assert!((adjusted.close - 5.5).abs() < 1e-9);
        assert!((adjusted.high - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_info() {
        let raw = json!({
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 22.0,
                        "fiftyTwoWeekLow": 18.5,
                        "fiftyTwoWeekHigh": 25.1,
                        "chartPreviousClose": 20.0
                    }
                }],
                "error": null
            }
        });
        let info = parse_info("ITUB4.SA", raw).unwrap();
        assert_eq!(info.current_price, Some(22.0));
        assert_eq!(info.fifty_two_week_low, Some(18.5));
        assert!((info.year_change.unwrap() - 0.1).abs() < 1e-9);
        assert!(info.dividend_yield.is_none());
    }

    #[test]
    fn test_parse_info_without_result() {
        let raw = json!({ "chart": { "result": null, "error": { "code": "Not Found" } } });
        assert!(parse_info("XXXX9.SA", raw).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_live_history() {
        let yahoo = YahooMarketData::new(Duration::from_secs(60), Duration::from_secs(20)).unwrap();
        let bars = yahoo
            .price_history("PETR4.SA", Period::Year, false)
            .await
            .unwrap();
        assert!(!bars.is_empty());
        assert!(yahoo.latest_price("PETR4.SA").await.unwrap().is_some());
    }
}
