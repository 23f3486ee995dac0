//! Batch Integration Tests
//!
//! Parallel builds over several instruments where some fail.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use roll_engine::application::ports::{ContractListing, HolidayCalendar};
use roll_engine::application::use_cases::{BatchError, BatchRunner, BuildInstrumentUseCase};
use roll_engine::config::BatchConfig;
use roll_engine::domain::contract::{ContractId, MonthCode, PriceObservation};
use roll_engine::domain::metadata::QualityConfig;
use roll_engine::domain::roll::RollParameterConfig;
use roll_engine::error::{ErrorCategory, RollError};
use roll_engine::infrastructure::{
    ConfigRollParameterSource, InMemoryPricePanel, InMemoryReferenceData, WeekdayHolidayCalendar,
};

type Runner = BatchRunner<
    InMemoryPricePanel,
    WeekdayHolidayCalendar,
    ConfigRollParameterSource,
    InMemoryReferenceData,
>;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn add_quarterly(panel: &mut InMemoryPricePanel, instrument: &str) {
    let calendar = WeekdayHolidayCalendar::default();
    for (month, expiry, first) in [
        (MonthCode::H, d(2025, 3, 21), d(2024, 9, 20)),
        (MonthCode::M, d(2025, 6, 20), d(2024, 12, 20)),
        (MonthCode::U, d(2025, 9, 19), d(2025, 3, 21)),
    ] {
        let observations: Vec<PriceObservation> = first
            .iter_days()
            .take_while(|date| *date <= expiry)
            .filter(|date| calendar.is_business_day(*date))
            .map(|date| PriceObservation::new(date, dec!(100)).with_volume(250))
            .collect();
        panel.insert(
            ContractListing {
                id: ContractId::new(instrument, 2025, month),
                expiry: Some(expiry),
                first_notice: None,
            },
            observations,
        );
    }
}

/// ES, NQ and YM are valid; ZN has a held cycle that misses priced months.
fn runner(config: BatchConfig) -> Runner {
    let mut panel = InMemoryPricePanel::new();
    for instrument in ["ES", "NQ", "YM", "ZN"] {
        add_quarterly(&mut panel, instrument);
    }

    let mut invalid = RollParameterConfig::new("HMUZ", -5, -1);
    invalid.hold_rollcycle = "HU".to_string();
    let parameters = ConfigRollParameterSource::new([
        ("ES".to_string(), RollParameterConfig::new("HMUZ", -5, -1)),
        ("NQ".to_string(), RollParameterConfig::new("HMUZ", -5, -1)),
        ("YM".to_string(), RollParameterConfig::new("HMUZ", -3, -1)),
        ("ZN".to_string(), invalid),
    ]);

    let use_case = BuildInstrumentUseCase::new(
        Arc::new(panel),
        Arc::new(WeekdayHolidayCalendar::default()),
        Arc::new(parameters),
        Arc::new(InMemoryReferenceData::default()),
        QualityConfig::default(),
    );
    BatchRunner::new(Arc::new(use_case), config)
}

fn instruments(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| (*c).to_string()).collect()
}

#[test]
fn test_failing_instrument_does_not_abort_others() {
    let config = BatchConfig {
        max_threads: 2,
        min_parallel_jobs: 2,
        ..BatchConfig::default()
    };
    let report = runner(config)
        .run(
            &instruments(&["ES", "ZN", "NQ", "YM", "GC"]),
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 2);
    assert_eq!(report.cancelled, 0);
    assert_eq!(
        report.failures_by_category.get(&ErrorCategory::Configuration),
        Some(&2)
    );
    assert_eq!(report.failures_by_category.len(), 1);

    let order: Vec<&str> = report.outcomes.iter().map(|o| o.instrument.as_str()).collect();
    assert_eq!(order, vec!["ES", "ZN", "NQ", "YM", "GC"]);

    let failures: Vec<(&str, &RollError)> = report.failures().collect();
    assert!(matches!(
        failures[0],
        ("ZN", RollError::InvalidRollParameters { .. })
    ));
    assert!(matches!(failures[1], ("GC", RollError::UnknownInstrument { .. })));
    assert!(
        failures
            .iter()
            .all(|(_, e)| e.category() == ErrorCategory::Configuration)
    );

    let ym = report.successes().find(|b| b.instrument == "YM").unwrap();
    assert_eq!(ym.calendar.events()[0].date, d(2025, 3, 18));
}

#[test]
fn test_stop_on_error_cancels_remaining_instruments() {
    // Sequential so the order of cancellation is deterministic.
    let config = BatchConfig {
        continue_on_error: false,
        min_parallel_jobs: 100,
        ..BatchConfig::default()
    };
    let cancel = CancellationToken::new();
    let report = runner(config)
        .run(&instruments(&["ES", "ZN", "NQ", "YM"]), &cancel)
        .unwrap();

    assert!(cancel.is_cancelled());
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.cancelled, 2);
    assert_eq!(
        report.failures_by_category.get(&ErrorCategory::Cancelled),
        Some(&2)
    );
    assert_eq!(report.skipped_contracts, 0);
    assert!(report.outcomes[2].is_cancelled());
}

#[test]
fn test_empty_batch_is_rejected() {
    let err = runner(BatchConfig::default())
        .run(&[], &CancellationToken::new())
        .unwrap_err();
    assert_eq!(err, BatchError::NoInstruments);
}
