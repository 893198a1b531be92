//! Capability interfaces and their production adapters

pub mod duckduckgo;
pub mod generation;
pub mod google;
pub mod links;
pub mod market;
pub mod search;
pub mod yahoo;

pub use duckduckgo::DuckDuckGoSearch;
pub use generation::{GeminiGenerator, TextGenerator};
pub use google::GoogleCustomSearch;
pub use links::{HttpLinkChecker, LinkChecker};
pub use market::{DividendEvent, InfoFields, MarketDataProvider, Period, PriceBar};
pub use search::{Candidate, Recency, SearchBackend, SearchOptions, SearchProvider};
pub use yahoo::YahooMarketData;
