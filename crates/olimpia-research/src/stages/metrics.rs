//! Price dashboard
//!
//! The nominal series gives the on-screen 52-week range, the adjusted series
//! gives the 12-month total return. When the history is empty the summary
//! info fields stand in for everything.

use crate::api::{MarketDataProvider, Period, PriceBar};
use crate::config::ResearchConfig;
use crate::error::Result;
use crate::pipeline::Stage;
use crate::prompts::Labels;
use crate::state::{NO_TICKER, ResearchState};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Inner width of a dashboard cell
const CELL: usize = 12;

/// Dashboard values before formatting
///
/// `dividend_yield` is already in percent, `change_12m` is a fraction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub price: Option<f64>,
    pub low_52w: Option<f64>,
    pub high_52w: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub change_12m: Option<f64>,
}

impl MetricsSnapshot {
    /// Drop values that contradict each other or are noise
    fn sanitize(mut self, floor: f64) -> Self {
        self.dividend_yield = self.dividend_yield.filter(|y| *y >= 0.0);
        self.low_52w = self.low_52w.filter(|l| *l > floor);

        if let Some(price) = self.price.filter(|p| p.is_finite()) {
            if self.low_52w.is_some_and(|low| price < low) {
                self.low_52w = None;
            }
            if self.high_52w.is_some_and(|high| price > high) {
                self.high_52w = None;
            }
        }
        self
    }

    /// Fixed-width box table
    pub fn render(&self, labels: &Labels, currency: &str) -> String {
        let money = |v: Option<f64>| fmt_value(v, currency, "", 1.0);
        let values = [
            money(self.price),
            money(self.low_52w),
            money(self.high_52w),
            fmt_value(self.dividend_yield, "", "%", 1.0),
            fmt_value(self.change_12m, "", "%", 100.0),
        ];
        let headers = [
            labels.price,
            labels.low_52w,
            labels.high_52w,
            labels.dividend_yield,
            labels.change_12m,
        ];

        let rule = |left: char, mid: char, right: char| {
            let bar = "─".repeat(CELL + 2);
            format!("{left}{}{right}", vec![bar; 5].join(&mid.to_string()))
        };
        let row = |cells: &[&str]| {
            let inner: Vec<String> = cells.iter().map(|c| format!(" {c:^CELL$} ")).collect();
            format!("│{}│", inner.join("│"))
        };
        let value_refs: Vec<&str> = values.iter().map(String::as_str).collect();

        [
            rule('┌', '┬', '┐'),
            row(&headers),
            rule('├', '┼', '┤'),
            row(&value_refs),
            rule('└', '┴', '┘'),
        ]
        .join("\n")
    }
}

/// `N/A` for missing and non-finite values
fn fmt_value(value: Option<f64>, prefix: &str, suffix: &str, mult: f64) -> String {
    match value.map(|v| v * mult) {
        Some(v) if v.is_finite() => format!("{prefix}{v:.2}{suffix}"),
        _ => "N/A".to_string(),
    }
}

/// Lowest low and highest high, ignoring bars at or below `floor`
///
/// Falls back to every bar when the filter would leave nothing.
pub fn range_52w(bars: &[PriceBar], floor: f64) -> Option<(f64, f64)> {
    let clean: Vec<&PriceBar> = bars.iter().filter(|b| b.low > floor).collect();
    let series: Vec<&PriceBar> = if clean.is_empty() {
        bars.iter().collect()
    } else {
        clean
    };
    if series.is_empty() {
        return None;
    }

    let low = series.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let high = series.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    Some((low, high))
}

/// Total return between the first and last adjusted close; zero without data
pub fn total_return(adjusted: &[PriceBar]) -> f64 {
    match (adjusted.first(), adjusted.last()) {
        (Some(first), Some(last)) if first.close != 0.0 => (last.close - first.close) / first.close,
        _ => 0.0,
    }
}

/// Fraction or percentage into percent
///
/// Feeds disagree on units; values above `threshold` are taken as percent.
pub fn yield_percent(raw: f64, threshold: f64) -> f64 {
    if raw > threshold { raw } else { raw * 100.0 }
}

/// Builds the `stock_data` block
pub struct MetricsComputer {
    config: Arc<ResearchConfig>,
    market: Arc<dyn MarketDataProvider>,
}

impl MetricsComputer {
    pub fn new(config: Arc<ResearchConfig>, market: Arc<dyn MarketDataProvider>) -> Self {
        Self { config, market }
    }

    fn labels(&self) -> &'static Labels {
        Labels::for_language(&self.config.language)
    }

    pub async fn compute(&self, ticker: &str) -> String {
        self.compute_at(ticker, Utc::now()).await
    }

    /// Same as [`Self::compute`], with `now` anchoring the dividend window
    pub async fn compute_at(&self, ticker: &str, now: DateTime<Utc>) -> String {
        if ticker.trim().is_empty() || ticker == NO_TICKER {
            debug!("No ticker, skipping metrics");
            return self.labels().metrics_unavailable.to_string();
        }

        match self.snapshot(ticker, now).await {
            Ok(snapshot) => snapshot.render(self.labels(), &self.config.currency_prefix),
            Err(e) => {
                warn!(ticker, error = %e, "Metrics unavailable");
                self.labels().metrics_unavailable.to_string()
            }
        }
    }

    /// Raw dashboard values, sanity filters applied
    pub async fn snapshot(&self, ticker: &str, now: DateTime<Utc>) -> Result<MetricsSnapshot> {
        let nominal = self
            .market
            .price_history(ticker, Period::Year, false)
            .await?;

        let snapshot = if nominal.is_empty() {
            debug!(ticker, "Empty history, using summary info");
            self.from_info(ticker).await
        } else {
            self.from_history(ticker, &nominal, now).await
        };

        Ok(snapshot.sanitize(self.config.degenerate_price_floor))
    }

    async fn from_history(
        &self,
        ticker: &str,
        nominal: &[PriceBar],
        now: DateTime<Utc>,
    ) -> MetricsSnapshot {
        let price = match self.market.latest_price(ticker).await {
            Ok(Some(p)) => Some(p),
            Ok(None) => None,
            Err(e) => {
                debug!(ticker, error = %e, "Latest quote failed");
                None
            }
        }
        .or_else(|| nominal.last().map(|b| b.close));

        let range = range_52w(nominal, self.config.degenerate_price_floor);

        let adjusted = self
            .market
            .price_history(ticker, Period::Year, true)
            .await
            .unwrap_or_else(|e| {
                debug!(ticker, error = %e, "Adjusted history failed");
                Vec::new()
            });

        MetricsSnapshot {
            price,
            low_52w: range.map(|(low, _)| low),
            high_52w: range.map(|(_, high)| high),
            dividend_yield: self.dividend_yield(ticker, price, now).await,
            change_12m: Some(total_return(&adjusted)),
        }
    }

    /// Reported yield, else trailing twelve months of dividends over price
    async fn dividend_yield(
        &self,
        ticker: &str,
        price: Option<f64>,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        let threshold = self.config.dividend_scale_threshold;

        let reported = match self.market.info(ticker).await {
            Ok(info) => info.dividend_yield.filter(|y| *y != 0.0 && y.is_finite()),
            Err(e) => {
                debug!(ticker, error = %e, "Info lookup failed");
                None
            }
        };
        if let Some(raw) = reported {
            return Some(yield_percent(raw, threshold));
        }

        let price = price.filter(|p| *p > 0.0)?;
        let events = match self.market.dividends(ticker).await {
            Ok(events) => events,
            Err(e) => {
                debug!(ticker, error = %e, "Dividend lookup failed");
                return None;
            }
        };

        let cutoff = now - Duration::days(365);
        let ttm: f64 = events
            .iter()
            .filter(|d| d.date >= cutoff)
            .map(|d| d.amount)
            .sum();
        Some(yield_percent(ttm / price, threshold))
    }

    async fn from_info(&self, ticker: &str) -> MetricsSnapshot {
        let info = match self.market.info(ticker).await {
            Ok(info) => info,
            Err(e) => {
                debug!(ticker, error = %e, "Info lookup failed");
                return MetricsSnapshot::default();
            }
        };

        MetricsSnapshot {
            price: info.current_price,
            low_52w: info.fifty_two_week_low,
            high_52w: info.fifty_two_week_high,
            dividend_yield: info
                .dividend_yield
                .map(|y| yield_percent(y, self.config.dividend_scale_threshold)),
            change_12m: info.year_change,
        }
    }
}

#[async_trait]
impl Stage for MetricsComputer {
    fn name(&self) -> &'static str {
        "metrics_computer"
    }

    async fn run(&self, state: &mut ResearchState) {
        let block = self.compute(state.ticker_or_sentinel()).await;
        state.set_stock_data(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::market::MockMarketDataProvider;
    use crate::api::{DividendEvent, InfoFields};
    use crate::error::ResearchError;
    use chrono::TimeZone;
    use olimpia_prompt::Language;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn bar(n: i64, low: f64, high: f64, close: f64) -> PriceBar {
        PriceBar {
            date: day(n),
            open: close,
            high,
            low,
            close,
        }
    }

    fn computer(market: MockMarketDataProvider, language: Language) -> MetricsComputer {
        let config = ResearchConfig {
            language,
            ..ResearchConfig::default()
        };
        MetricsComputer::new(Arc::new(config), Arc::new(market))
    }

    fn values_row(block: &str) -> Vec<String> {
        block
            .lines()
            .nth(3)
            .unwrap()
            .split('│')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_range_skips_degenerate_ticks() {
        let bars = vec![bar(0, 0.0, 11.0, 10.0), bar(1, 9.0, 12.0, 11.0), bar(2, 9.5, 13.0, 12.0)];
        assert_eq!(range_52w(&bars, 0.01), Some((9.0, 13.0)));

        let all_bad = vec![bar(0, 0.0, 1.0, 0.5), bar(1, 0.005, 2.0, 1.0)];
        assert_eq!(range_52w(&all_bad, 0.01), Some((0.0, 2.0)));
        assert_eq!(range_52w(&[], 0.01), None);
    }

    #[test]
    fn test_total_return() {
        let adjusted = vec![bar(0, 9.0, 11.0, 10.0), bar(1, 11.0, 13.0, 12.0)];
        assert!((total_return(&adjusted) - 0.2).abs() < 1e-9);
        assert!(total_return(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_yield_scale() {
        assert!((yield_percent(0.05, 0.6) - 5.0).abs() < 1e-9);
        assert!((yield_percent(11.45, 0.6) - 11.45).abs() < 1e-9);
    }

    #[test]
    fn test_bound_rule() {
        let snapshot = MetricsSnapshot {
            price: Some(8.0),
            low_52w: Some(9.0),
            high_52w: Some(12.0),
            dividend_yield: Some(-1.0),
            change_12m: Some(0.1),
        }
        .sanitize(0.01);
        assert_eq!(snapshot.low_52w, None);
        assert_eq!(snapshot.high_52w, Some(12.0));
        assert_eq!(snapshot.dividend_yield, None);

        let above = MetricsSnapshot {
            price: Some(15.0),
            low_52w: Some(9.0),
            high_52w: Some(12.0),
            ..MetricsSnapshot::default()
        }
        .sanitize(0.01);
        assert_eq!(above.low_52w, Some(9.0));
        assert_eq!(above.high_52w, None);
    }

    #[test]
    fn test_render_layout() {
        let snapshot = MetricsSnapshot {
            price: Some(10.0),
            low_52w: Some(8.5),
            high_52w: None,
            dividend_yield: Some(6.123),
            change_12m: Some(f64::NAN),
        };
        let block = snapshot.render(Labels::for_language(&Language::Portuguese), "R$ ");
        let lines: Vec<&str> = block.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with('┌'));
        assert!(lines[1].contains(" PREÇO ATUAL  "));
        assert!(lines.iter().all(|l| l.chars().count() == 76));
        assert_eq!(
            values_row(&block),
            ["R$ 10.00", "R$ 8.50", "N/A", "6.12%", "N/A"]
        );
    }

    #[tokio::test]
    async fn test_sentinel_makes_no_calls() {
        let c = computer(MockMarketDataProvider::new(), Language::Portuguese);
        assert_eq!(c.compute(NO_TICKER).await, "Dados Indisponíveis");
    }

    #[tokio::test]
    async fn test_unknown_ticker_renders_all_na() {
        let mut market = MockMarketDataProvider::new();
        market
            .expect_price_history()
            .returning(|_, _, _| Ok(Vec::new()));
        market.expect_info().returning(|_| {
            Err(ResearchError::market("XXXX9.SA", "no such symbol"))
        });

        let block = computer(market, Language::English).compute("XXXX9.SA").await;
        assert!(block.contains("CURRENT PRICE"));
        assert_eq!(values_row(&block), ["N/A"; 5]);
    }

    #[tokio::test]
    async fn test_history_metrics_with_manual_yield() {
        let mut market = MockMarketDataProvider::new();
        market
            .expect_price_history()
            .withf(|_, _, adjusted| !*adjusted)
            .returning(|_, _, _| {
                Ok(vec![
                    bar(0, 0.0, 21.0, 20.0),
                    bar(100, 18.0, 22.0, 21.0),
                    bar(300, 19.0, 26.0, 25.0),
                ])
            });
        market
            .expect_price_history()
            .withf(|_, _, adjusted| *adjusted)
            .returning(|_, _, _| Ok(vec![bar(0, 0.0, 0.0, 16.0), bar(300, 0.0, 0.0, 20.0)]));
        market.expect_latest_price().returning(|_| Ok(Some(25.0)));
        market.expect_info().returning(|_| Ok(InfoFields::default()));
        market.expect_dividends().returning(|_| {
            Ok(vec![
                // Outside the trailing year
                DividendEvent { date: day(-200), amount: 5.0 },
                DividendEvent { date: day(120), amount: 1.0 },
                DividendEvent { date: day(250), amount: 0.5 },
            ])
        });

        let c = computer(market, Language::English);
        let block = c.compute_at("VALE3.SA", day(310)).await;
        assert_eq!(
            values_row(&block),
            ["R$ 25.00", "R$ 18.00", "R$ 26.00", "6.00%", "25.00%"]
        );
    }

    #[tokio::test]
    async fn test_reported_yield_already_in_percent() {
        let mut market = MockMarketDataProvider::new();
        market
            .expect_price_history()
            .returning(|_, _, _| Ok(vec![bar(0, 9.0, 11.0, 10.0)]));
        market.expect_latest_price().returning(|_| Ok(None));
        market.expect_info().returning(|_| {
            Ok(InfoFields {
                dividend_yield: Some(11.45),
                ..InfoFields::default()
            })
        });
        market.expect_dividends().times(0);

        let snapshot = computer(market, Language::English)
            .snapshot("ITUB4.SA", day(0))
            .await
            .unwrap();
        assert_eq!(snapshot.price, Some(10.0));
        assert_eq!(snapshot.dividend_yield, Some(11.45));
        assert_eq!(snapshot.change_12m, Some(0.0));
    }

    #[tokio::test]
    async fn test_info_fallback() {
        let mut market = MockMarketDataProvider::new();
        market
            .expect_price_history()
            .returning(|_, _, _| Ok(Vec::new()));
        market.expect_info().returning(|_| {
            Ok(InfoFields {
                current_price: Some(30.0),
                fifty_two_week_low: Some(0.001),
                fifty_two_week_high: Some(35.0),
                dividend_yield: Some(0.04),
                year_change: Some(-0.1),
            })
        });

        let block = computer(market, Language::English).compute("WEGE3.SA").await;
        assert_eq!(
            values_row(&block),
            ["R$ 30.00", "N/A", "R$ 35.00", "4.00%", "-10.00%"]
        );
    }

    #[tokio::test]
    async fn test_history_error_is_unavailable() {
        let mut market = MockMarketDataProvider::new();
        market
            .expect_price_history()
            .returning(|t, _, _| Err(ResearchError::market(t, "timeout")));

        let block = computer(market, Language::English).compute("PETR4.SA").await;
        assert_eq!(block, "Data unavailable");
    }
}
