//! Market-data capability

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One daily bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// One cash dividend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DividendEvent {
    pub date: DateTime<Utc>,
    pub amount: f64,
}

/// Summary fields used when the price series is empty
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoFields {
    pub current_price: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    /// Fraction or percentage, depending on the feed
    pub dividend_yield: Option<f64>,
    /// Fraction, e.g. `0.12` for +12%
    pub year_change: Option<f64>,
}

/// History window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    pub fn days(self) -> i64 {
        match self {
            Period::Day => 1,
            Period::Week => 7,
            Period::Month => 31,
            Period::Year => 365,
        }
    }
}

/// Quotes, history and dividends for exchange tickers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Most recent traded price, `None` when the feed has none
    async fn latest_price(&self, ticker: &str) -> Result<Option<f64>>;

    /// Daily bars, oldest first; `adjusted` folds dividends into the prices
    async fn price_history(
        &self,
        ticker: &str,
        period: Period,
        adjusted: bool,
    ) -> Result<Vec<PriceBar>>;

    /// Dividend events, oldest first
    async fn dividends(&self, ticker: &str) -> Result<Vec<DividendEvent>>;

    /// Fallback summary fields
    async fn info(&self, ticker: &str) -> Result<InfoFields>;
}
