//! Shared utilities for olimpia
//!
//! This crate provides common functionality used across the olimpia workspace:
//! tracing setup and the small text helpers the research pipeline needs when
//! cleaning search results and model output.

pub mod logging;
pub mod text;

pub use logging::{init_tracing, init_tracing_with};
pub use text::{decode_entities, fold_accents, strip_tags, truncate_chars};
