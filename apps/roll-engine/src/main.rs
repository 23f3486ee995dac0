//! Roll Engine Binary
//!
//! Builds roll calendars and metadata for every instrument in a price panel
//! snapshot and writes one JSON document per instrument, plus the batch's
//! Prometheus counters as `metrics.prom`.
//!
//! # Usage
//!
//! ```bash
//! ROLL_ENGINE_PANEL=data/panel.json cargo run --bin roll-engine
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `ROLL_ENGINE_PANEL`: Path to the JSON price panel snapshot
//!
//! ## Optional
//! - `ROLL_ENGINE_CONFIG`: Path to the YAML config (default: config.yaml)
//! - `RUST_LOG`: Log filter (overrides `logging.level`)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use roll_engine::application::ports::PricePanelSource;
use roll_engine::application::services::CalendarCache;
use roll_engine::application::use_cases::{BatchReport, BatchRunner, BuildInstrumentUseCase};
use roll_engine::config::{Config, load_config};
use roll_engine::domain::metadata::InstrumentMetadata;
use roll_engine::domain::roll::{RollCalendarRecord, RollWarning};
use roll_engine::infrastructure::{
    ConfigRollParameterSource, InMemoryPricePanel, InMemoryReferenceData, WeekdayHolidayCalendar,
};
use roll_engine::telemetry::init_tracing;
use roll_engine::telemetry::metrics::init_metrics;

/// Default config file path.
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Document written for each successfully built instrument.
#[derive(Serialize)]
struct InstrumentDocument<'a> {
    instrument: &'a str,
    snapshot_version: &'a str,
    records: Vec<RollCalendarRecord>,
    warnings: &'a [RollWarning],
    metadata: &'a InstrumentMetadata,
    metadata_rows: Vec<BTreeMap<String, String>>,
}

fn main() -> Result<()> {
    load_dotenv();

    let config_path =
        std::env::var("ROLL_ENGINE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(Some(&config_path))
        .with_context(|| format!("loading config from {config_path}"))?;
    init_tracing(&config.logging);
    let prometheus = init_metrics();

    tracing::info!(
        environment = %config.environment.name,
        config = %config_path,
        "Starting Roll Engine"
    );

    let panel_path = std::env::var("ROLL_ENGINE_PANEL")
        .context("ROLL_ENGINE_PANEL must point to a price panel snapshot")?;
    let panel = Arc::new(
        InMemoryPricePanel::from_path(&panel_path)
            .with_context(|| format!("loading price panel from {panel_path}"))?,
    );

    let report = run_batch(&config, Arc::clone(&panel))?;
    let output_dir = PathBuf::from(&config.environment.output_path);
    write_outputs(&output_dir, &report)?;
    if let Some(handle) = prometheus {
        let path = output_dir.join("metrics.prom");
        std::fs::write(&path, handle.render())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    print_summary(&report);

    tracing::info!("Roll Engine finished");
    Ok(())
}

/// Wire the adapters and build every instrument in the panel.
fn run_batch(config: &Config, panel: Arc<InMemoryPricePanel>) -> Result<BatchReport> {
    let holidays = Arc::new(WeekdayHolidayCalendar::new(config.holidays.iter().copied()));
    let parameters = Arc::new(ConfigRollParameterSource::from_config(config));
    let reference = Arc::new(InMemoryReferenceData::from_config(config));
    let instruments = panel.instruments();

    let use_case = BuildInstrumentUseCase::new(
        panel,
        holidays,
        parameters,
        reference,
        config.data_quality.clone(),
    )
    .with_cache(Arc::new(CalendarCache::new()));

    let runner = BatchRunner::new(Arc::new(use_case), config.batch.clone());
    let report = runner.run(&instruments, &CancellationToken::new())?;
    Ok(report)
}

/// Write one `<instrument>_roll_calendar.json` per successful build.
fn write_outputs(output_dir: &Path, report: &BatchReport) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    for build in report.successes() {
        let document = InstrumentDocument {
            instrument: &build.instrument,
            snapshot_version: &build.snapshot_version,
            records: build.calendar.records(),
            warnings: build.calendar.warnings(),
            metadata: &build.metadata,
            metadata_rows: build.metadata.merged_rows(),
        };
        let path = output_dir.join(format!(
            "{}_roll_calendar.json",
            build.instrument.to_lowercase()
        ));
        let json = serde_json::to_string_pretty(&document)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Wrote roll calendar");
    }

    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_summary(report: &BatchReport) {
    println!(
        "Batch {}: {} succeeded, {} failed, {} cancelled, {} contracts skipped in {} ms",
        report.run_id,
        report.succeeded,
        report.failed,
        report.cancelled,
        report.skipped_contracts,
        report.elapsed_ms
    );
    for (category, count) in &report.failures_by_category {
        println!("  {category:<14} {count}");
    }
    for build in report.successes() {
        println!(
            "  OK    {:<8} rolls={:<4} warnings={:<4} quality={:.2}",
            build.instrument,
            build.calendar.events().len(),
            build.calendar.warnings().len(),
            build.metadata.quality.score
        );
    }
    for (instrument, error) in report.failures() {
        println!("  FAIL  {instrument:<8} [{}] {error}", error.category());
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}
