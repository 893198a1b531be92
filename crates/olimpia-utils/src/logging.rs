//! Logging and tracing utilities

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber with default configuration
///
/// Honors `RUST_LOG` and falls back to `info`.
pub fn init_tracing() {
    init_tracing_with("info");
}

/// Initialize tracing with a fallback filter used when `RUST_LOG` is unset
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_tracing_with(default_filter: &str) {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
