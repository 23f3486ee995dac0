//! Logging and metrics setup.

pub mod metrics;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::LoggingConfig;

/// Initialize tracing from the logging configuration.
///
/// `RUST_LOG` overrides the configured level. Calling this more than once
/// is harmless; later calls leave the first subscriber in place. Metrics
/// are installed separately with [`metrics::init_metrics`].
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("roll_engine={}", config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    // Err only when a subscriber is already set.
    let _ = if config.format == "json" {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().pretty()).try_init()
    };
}
