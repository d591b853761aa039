//! Logging initialization.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::LoggingConfig;

const DEFAULT_FILTER: &str = "info,swapframe=debug";

static INIT: Once = Once::new();

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter, which wins over the built-in
/// default. Subsequent calls are ignored, so tests and the binary can both
/// call this freely.
///
/// # Example
/// ```
/// swapframe_core::init_logging(&swapframe_core::LoggingConfig::default());
/// tracing::info!("Renderer initialized");
/// ```
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .ok()
            .or_else(|| {
                config
                    .filter
                    .as_deref()
                    .and_then(|f| EnvFilter::try_new(f).ok())
            })
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

        let result = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init();

        // Another subscriber may already be installed (e.g. by a test harness).
        if result.is_ok() {
            tracing::debug!("logging initialized");
        }
    });
}
