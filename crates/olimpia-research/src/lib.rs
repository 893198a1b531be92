//! Equity research pipeline for exchange-listed companies
//!
//! A free-text company name goes through four stages:
//!
//! - `TickerResolver`: company name to a validated exchange ticker
//! - `EvidenceCollector`: corporate summary and vetted news items
//! - `MetricsComputer`: price, 52-week range, dividend yield and 12-month return
//! - `ReportSynthesizer`: narrative report, with a deterministic fallback
//!
//! Search, market data, link checks and text generation are reached through
//! capability traits in [`api`], so every stage can run against fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use olimpia_research::{ResearchConfig, ResearchPipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(ResearchConfig::from_env());
//!     let pipeline = ResearchPipeline::from_config(config)?;
//!
//!     let state = pipeline.run("Petrobras").await;
//!     println!("{}", state.into_report());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod rotation;
pub mod stages;
pub mod state;

#[cfg(feature = "testing")]
pub mod testing;

// Re-export main types for convenience
pub use config::{ResearchConfig, ResearchConfigBuilder};
pub use error::{GenerationError, ResearchError, Result};
pub use pipeline::{Capabilities, ResearchPipeline, Stage};
pub use rotation::{RotationOutcome, RotationPolicy};
pub use stages::{
    Evidence, EvidenceCollector, MetricsComputer, ReportSynthesizer, ResolvedTicker, Strategy,
    TickerResolver,
};
pub use state::{NO_TICKER, ResearchState};

// Re-export Language from olimpia-prompt
pub use olimpia_prompt::Language;
