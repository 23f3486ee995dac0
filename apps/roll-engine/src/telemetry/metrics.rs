//! Roll engine metrics.
//!
//! Counters are recorded through the `metrics` facade. [`init_metrics`]
//! installs a Prometheus recorder; the binary renders it to
//! `metrics.prom` next to the calendars when the batch finishes.
//!
//! # Metrics
//!
//! - **Builds**: calendars built and failed, by instrument
//! - **Data**: contracts skipped by the builder
//! - **Cache**: calendar cache hits and misses

use std::sync::OnceLock;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::warn;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder and describe all counters.
///
/// Returns `None` when another recorder is already installed. Repeated
/// calls return the first handle.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Some(handle.clone());
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            register_metrics();
            Some(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
        }
        Err(err) => {
            warn!(error = %err, "Metrics recorder not installed");
            None
        }
    }
}

/// Prometheus handle, if [`init_metrics`] succeeded.
#[must_use]
pub fn metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!(
        "roll_engine_calendars_built_total",
        "Roll calendars built successfully"
    );
    describe_counter!(
        "roll_engine_builds_failed_total",
        "Instrument builds that failed, by error reason"
    );
    describe_counter!(
        "roll_engine_contracts_skipped_total",
        "Distinct contracts dropped from the priced chain"
    );
    describe_counter!(
        "roll_engine_cache_hits_total",
        "Calendar cache lookups served from the cache"
    );
    describe_counter!(
        "roll_engine_cache_misses_total",
        "Calendar cache lookups that required a build"
    );
}

/// Record a successful build.
pub fn record_calendar_built(instrument: &str) {
    counter!(
        "roll_engine_calendars_built_total",
        "instrument" => instrument.to_string()
    )
    .increment(1);
}

/// Record a failed build.
pub fn record_build_failed(instrument: &str, reason: &'static str) {
    counter!(
        "roll_engine_builds_failed_total",
        "instrument" => instrument.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// Record contracts dropped from the priced chain.
pub fn record_contracts_skipped(instrument: &str, count: u64) {
    counter!(
        "roll_engine_contracts_skipped_total",
        "instrument" => instrument.to_string()
    )
    .increment(count);
}

/// Record a cache hit.
pub fn record_cache_hit() {
    counter!("roll_engine_cache_hits_total").increment(1);
}

/// Record a cache miss.
pub fn record_cache_miss() {
    counter!("roll_engine_cache_misses_total").increment(1);
}
