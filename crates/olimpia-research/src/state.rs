//! The record threaded through one pipeline run

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Sentinel ticker for an unresolved company
pub const NO_TICKER: &str = "N/A";

/// State of one research run
///
/// `company_name` is fixed at creation. Every other field is written exactly
/// once by the stage that owns it; a second write is ignored and logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchState {
    run_id: Uuid,
    company_name: String,
    ticker: Option<String>,
    summary_data: Option<String>,
    news_data: Option<String>,
    stock_data: Option<String>,
    final_report: Option<String>,
}

fn write_once(slot: &mut Option<String>, field: &str, value: String) -> bool {
    if slot.is_some() {
        warn!(field, "Field already written, keeping first value");
        return false;
    }
    *slot = Some(value);
    true
}

impl ResearchState {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            company_name: company_name.into(),
            ticker: None,
            summary_data: None,
            news_data: None,
            stock_data: None,
            final_report: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn ticker(&self) -> Option<&str> {
        self.ticker.as_deref()
    }

    pub fn summary_data(&self) -> Option<&str> {
        self.summary_data.as_deref()
    }

    pub fn news_data(&self) -> Option<&str> {
        self.news_data.as_deref()
    }

    pub fn stock_data(&self) -> Option<&str> {
        self.stock_data.as_deref()
    }

    pub fn final_report(&self) -> Option<&str> {
        self.final_report.as_deref()
    }

    /// Ticker, or the sentinel when resolution has not run
    pub fn ticker_or_sentinel(&self) -> &str {
        self.ticker().unwrap_or(NO_TICKER)
    }

    pub fn set_ticker(&mut self, ticker: impl Into<String>) -> bool {
        write_once(&mut self.ticker, "ticker", ticker.into())
    }

    /// Both evidence fields are written together
    pub fn set_evidence(&mut self, summary: impl Into<String>, news: impl Into<String>) -> bool {
        let summary_written = write_once(&mut self.summary_data, "summary_data", summary.into());
        let news_written = write_once(&mut self.news_data, "news_data", news.into());
        summary_written && news_written
    }

    pub fn set_stock_data(&mut self, block: impl Into<String>) -> bool {
        write_once(&mut self.stock_data, "stock_data", block.into())
    }

    pub fn set_final_report(&mut self, report: impl Into<String>) -> bool {
        write_once(&mut self.final_report, "final_report", report.into())
    }

    /// Consume the state, returning the report (empty if synthesis never ran)
    pub fn into_report(self) -> String {
        self.final_report.unwrap_or_default()
    }
}
