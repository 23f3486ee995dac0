//! Metadata Integration Tests
//!
//! Quality scoring and flattening of metadata built from a price panel.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use roll_engine::application::ports::{ContractListing, HolidayCalendar};
use roll_engine::application::use_cases::{BuildInstrumentUseCase, InstrumentBuild};
use roll_engine::domain::contract::{ContractId, MonthCode, PriceObservation};
use roll_engine::domain::metadata::{InstrumentReference, QualityConfig};
use roll_engine::domain::roll::RollParameterConfig;
use roll_engine::infrastructure::{
    ConfigRollParameterSource, InMemoryPricePanel, InMemoryReferenceData, WeekdayHolidayCalendar,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// First `count` business days from `start`, excluding the indices in `skip`.
fn business_days(start: NaiveDate, count: usize, skip: &[usize]) -> Vec<NaiveDate> {
    let calendar = WeekdayHolidayCalendar::default();
    start
        .iter_days()
        .filter(|date| calendar.is_business_day(*date))
        .take(count)
        .enumerate()
        .filter(|(i, _)| !skip.contains(i))
        .map(|(_, date)| date)
        .collect()
}

fn build(dates: &[NaiveDate], volume: Option<u64>, reference: InMemoryReferenceData) -> InstrumentBuild {
    let observations: Vec<PriceObservation> = dates
        .iter()
        .map(|date| {
            let observation = PriceObservation::new(*date, dec!(71.35));
            match volume {
                Some(v) => observation.with_volume(v),
                None => observation,
            }
        })
        .collect();
    let expiry = *dates.last().unwrap();

    let mut panel = InMemoryPricePanel::new();
    panel.insert(
        ContractListing {
            id: ContractId::new("CL", 2025, MonthCode::F),
            expiry: Some(expiry),
            first_notice: None,
        },
        observations,
    );

    let parameters = ConfigRollParameterSource::new([(
        "CL".to_string(),
        RollParameterConfig::new("FGHJKMNQUVXZ", -3, 1),
    )]);
    BuildInstrumentUseCase::new(
        Arc::new(panel),
        Arc::new(WeekdayHolidayCalendar::default()),
        Arc::new(parameters),
        Arc::new(reference),
        QualityConfig::default(),
    )
    .execute("CL", &CancellationToken::new())
    .unwrap()
}

#[test]
fn test_near_complete_series_scores_near_maximum() {
    // 252 business days with two isolated gaps.
    let dates = business_days(d(2024, 1, 1), 252, &[100, 200]);
    let metadata = build(&dates, Some(5_000), InMemoryReferenceData::default()).metadata;

    assert_eq!(metadata.observation_count, 250);
    assert_eq!(metadata.expected_business_days, 252);
    assert_eq!(metadata.longest_gap_days, 1);
    assert!(metadata.quality.score > 99.0, "score {}", metadata.quality.score);
    assert!(metadata.quality.acceptable);
}

#[test]
fn test_series_without_volume_scores_zero() {
    let dates = business_days(d(2024, 1, 1), 60, &[]);
    let metadata = build(&dates, None, InMemoryReferenceData::default()).metadata;

    assert_eq!(metadata.observation_count, 60);
    assert!(metadata.quality.score.abs() < f64::EPSILON);
    assert!(!metadata.quality.acceptable);
}

#[test]
fn test_long_gap_fails_gap_check() {
    let skip: Vec<usize> = (20..30).collect();
    let dates = business_days(d(2024, 1, 1), 100, &skip);
    let metadata = build(&dates, Some(5_000), InMemoryReferenceData::default()).metadata;

    assert_eq!(metadata.longest_gap_days, 10);
    assert!(!metadata.quality.gap_within_limit);
    assert!(!metadata.quality.acceptable);
}

#[test]
fn test_flat_rows_carry_reference_and_contract_fields() {
    let reference = InMemoryReferenceData::new([(
        "CL".to_string(),
        InstrumentReference {
            exchange: "NYMEX".to_string(),
            currency: "USD".to_string(),
            multiplier: Some(dec!(1000)),
            tick_size: Some(dec!(0.01)),
            ..InstrumentReference::default()
        },
    )]);
    let dates = business_days(d(2024, 1, 1), 40, &[]);
    let metadata = build(&dates, Some(5_000), reference).metadata;

    assert_eq!(metadata.reference.effective_tick_value(), Some(dec!(10.00)));

    let flat = metadata.to_flat_map();
    assert_eq!(flat.get("instrument").map(String::as_str), Some("CL"));
    assert_eq!(flat.get("exchange").map(String::as_str), Some("NYMEX"));

    let rows = metadata.merged_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("exchange").map(String::as_str), Some("NYMEX"));
    assert!(rows[0].contains_key("roll_in"));
}
