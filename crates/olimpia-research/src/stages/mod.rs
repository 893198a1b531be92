//! The four pipeline stages

pub mod evidence;
pub mod metrics;
pub mod resolver;
pub mod synthesis;

pub use evidence::{CandidatePool, Evidence, EvidenceCollector, NewsItem};
pub use metrics::{MetricsComputer, MetricsSnapshot};
pub use resolver::{CompanyInput, KNOWN_TICKERS, ResolvedTicker, Strategy, TickerResolver};
pub use synthesis::ReportSynthesizer;
