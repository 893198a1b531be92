//! Command-line interface for olimpia
//!
//! # Usage
//!
//! ```bash
//! # Optional: generation keys (comma-separated) and Google Custom Search
//! export GEMINI_API_KEY="key-1,key-2"
//! export GOOGLE_API_KEY="..." GOOGLE_CSE_ID="..."
//!
//! olimpia "Magazine Luiza" --language pt
//! olimpia PETR4 --format json
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use olimpia_research::{Language, ResearchConfig, ResearchPipeline};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// The report as markdown
    Text,
    /// The whole research state as JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "olimpia")]
#[command(about = "Equity research report for a listed company", long_about = None)]
struct Args {
    /// Company name or ticker, e.g. "Itaú" or "WEGE3"
    #[arg(required = true, num_args = 1..)]
    company: Vec<String>,

    /// Report language (en, pt); overrides OLIMPIA_LANGUAGE
    #[arg(short, long)]
    language: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    olimpia_utils::init_tracing_with("warn,olimpia_research=info");

    let args = Args::parse();
    let company = args.company.join(" ");

    let mut config = ResearchConfig::from_env();
    if let Some(lang) = args.language.as_deref() {
        config.language = Language::from_code(lang);
    }

    let pipeline = ResearchPipeline::from_config(Arc::new(config))
        .context("invalid configuration")?;

    info!(%company, "Starting research");
    let state = pipeline.run(company).await;

    match args.format {
        OutputFormat::Text => println!("{}", state.into_report()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
    }

    Ok(())
}
