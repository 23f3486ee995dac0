//! Instrument and contract metadata aggregation.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::calendar::HolidayCalendar;
use crate::domain::contract::{Contract, ContractId, ContractUniverse, PriceHistory, PriceObservation};
use crate::domain::roll::RollCalendar;

use super::{InstrumentReference, QualityConfig, QualityScore, SeriesStats};

/// Per-contract metadata row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMetadata {
    /// Contract identity.
    pub contract: ContractId,
    /// Expiry date.
    pub expiry: NaiveDate,
    /// First notice date.
    pub first_notice: Option<NaiveDate>,
    /// First price date.
    pub first_date: Option<NaiveDate>,
    /// Last price date.
    pub last_date: Option<NaiveDate>,
    /// Price observations.
    pub observation_count: usize,
    /// Date the contract became the priced contract.
    pub roll_in: Option<NaiveDate>,
    /// Date the contract stopped being the priced contract.
    pub roll_out: Option<NaiveDate>,
}

impl ContractMetadata {
    fn to_flat_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("contract".to_string(), self.contract.key());
        map.insert("symbol".to_string(), self.contract.symbol());
        map.insert("month_code".to_string(), self.contract.month().to_string());
        map.insert("year".to_string(), self.contract.year().to_string());
        map.insert("expiry".to_string(), self.expiry.to_string());
        map.insert("first_notice".to_string(), display(self.first_notice));
        map.insert("first_date".to_string(), display(self.first_date));
        map.insert("last_date".to_string(), display(self.last_date));
        map.insert(
            "observation_count".to_string(),
            self.observation_count.to_string(),
        );
        map.insert("roll_in".to_string(), display(self.roll_in));
        map.insert("roll_out".to_string(), display(self.roll_out));
        map
    }
}

/// Quality-scored metadata for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentMetadata {
    /// Instrument code.
    pub instrument: String,
    /// Reference attributes.
    pub reference: InstrumentReference,
    /// First date of the stitched priced series.
    pub first_date: Option<NaiveDate>,
    /// Last date of the stitched priced series.
    pub last_date: Option<NaiveDate>,
    /// Registered contracts.
    pub contract_count: usize,
    /// Observations in the stitched priced series.
    pub observation_count: usize,
    /// Business days between first and last date.
    pub expected_business_days: u32,
    /// Longest run of missing business days.
    pub longest_gap_days: u32,
    /// Rolls in the calendar.
    pub roll_count: usize,
    /// Warnings recorded while building the calendar.
    pub warnings_count: usize,
    /// Quality sub-scores and flags.
    pub quality: QualityScore,
    /// One row per registered contract.
    pub contracts: Vec<ContractMetadata>,
}

impl InstrumentMetadata {
    /// Flat key/value record of the instrument-level fields.
    #[must_use]
    pub fn to_flat_map(&self) -> BTreeMap<String, String> {
        let reference = &self.reference;
        let quality = &self.quality;
        let mut map = BTreeMap::new();
        let mut put = |key: &str, value: String| {
            map.insert(key.to_string(), value);
        };

        put("instrument", self.instrument.clone());
        put("exchange", reference.exchange.clone());
        put("asset_class", reference.asset_class.clone());
        put("currency", reference.currency.clone());
        put("trading_hours", reference.trading_hours.clone());
        put("ticker", reference.ticker.clone());
        put("multiplier", display(reference.multiplier));
        put("tick_size", display(reference.tick_size));
        put("tick_value", display(reference.effective_tick_value()));
        put("first_date", display(self.first_date));
        put("last_date", display(self.last_date));
        put("contract_count", self.contract_count.to_string());
        put("observation_count", self.observation_count.to_string());
        put("expected_business_days", self.expected_business_days.to_string());
        put("longest_gap_days", self.longest_gap_days.to_string());
        put("roll_count", self.roll_count.to_string());
        put("warnings_count", self.warnings_count.to_string());
        put("coverage", format!("{:.4}", quality.coverage));
        put("continuity", format!("{:.4}", quality.continuity));
        put("volume_sufficiency", format!("{:.4}", quality.volume));
        put("quality_score", format!("{:.2}", quality.score));
        put(
            "meets_min_observations",
            quality.meets_min_observations.to_string(),
        );
        put("gap_within_limit", quality.gap_within_limit.to_string());
        put(
            "missing_within_limit",
            quality.missing_within_limit.to_string(),
        );
        put("acceptable", quality.acceptable.to_string());
        map
    }

    /// One row per contract joined with the instrument fields. Contract
    /// fields win on key collisions.
    #[must_use]
    pub fn merged_rows(&self) -> Vec<BTreeMap<String, String>> {
        let instrument = self.to_flat_map();
        self.contracts
            .iter()
            .map(|contract| {
                let mut row = contract.to_flat_map();
                for (key, value) in &instrument {
                    row.entry(key.clone()).or_insert_with(|| value.clone());
                }
                row
            })
            .collect()
    }
}

fn display<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(String::new, |v| v.to_string())
}

/// Builds [`InstrumentMetadata`] from a calendar and its price history.
pub struct MetadataAggregator<'a> {
    calendar: &'a dyn HolidayCalendar,
    config: &'a QualityConfig,
}

impl<'a> MetadataAggregator<'a> {
    /// Create an aggregator.
    #[must_use]
    pub fn new(calendar: &'a dyn HolidayCalendar, config: &'a QualityConfig) -> Self {
        Self { calendar, config }
    }

    /// Observations of each priced contract within its priced window.
    #[must_use]
    pub fn stitched_series<'h>(
        &self,
        roll: &RollCalendar,
        history: &'h PriceHistory,
    ) -> Vec<&'h PriceObservation> {
        roll.priced_segments()
            .iter()
            .flat_map(|segment| {
                history
                    .observations_between(&segment.contract, segment.from, segment.until)
                    .take_while(|o| o.date <= roll.end_date())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Raw counts over a date-ordered series.
    #[must_use]
    pub fn series_stats(&self, series: &[&PriceObservation]) -> SeriesStats {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return SeriesStats::default();
        };

        let mut stats = SeriesStats {
            observations: series.len(),
            expected_business_days: self.calendar.business_days_between(first.date, last.date),
            ..SeriesStats::default()
        };

        let mut previous: Option<NaiveDate> = None;
        for observation in series {
            if self.calendar.is_business_day(observation.date) {
                stats.observed_business_days += 1;
            }
            if let Some(volume) = observation.volume {
                stats.with_volume += 1;
                if volume >= self.config.min_volume_for_liquidity {
                    stats.liquid_observations += 1;
                }
            }
            if let Some(previous) = previous {
                stats.longest_gap_days = stats
                    .longest_gap_days
                    .max(self.missing_between(previous, observation.date));
            }
            previous = Some(observation.date);
        }

        stats
    }

    /// Business days strictly between two dates.
    fn missing_between(&self, earlier: NaiveDate, later: NaiveDate) -> u32 {
        match (earlier.succ_opt(), later.pred_opt()) {
            (Some(from), Some(until)) => self.calendar.business_days_between(from, until),
            _ => 0,
        }
    }

    /// Aggregate instrument metadata.
    #[must_use]
    pub fn aggregate(
        &self,
        roll: &RollCalendar,
        universe: &ContractUniverse,
        history: &PriceHistory,
        reference: InstrumentReference,
    ) -> InstrumentMetadata {
        let series = self.stitched_series(roll, history);
        let stats = self.series_stats(&series);
        let quality = QualityScore::compute(&stats, self.config);
        let contracts = universe.contracts_for(roll.instrument());

        InstrumentMetadata {
            instrument: roll.instrument().to_string(),
            reference,
            first_date: series.first().map(|o| o.date),
            last_date: series.last().map(|o| o.date),
            contract_count: contracts.len(),
            observation_count: stats.observations,
            expected_business_days: stats.expected_business_days,
            longest_gap_days: stats.longest_gap_days,
            roll_count: roll.events().len(),
            warnings_count: roll.warnings().len(),
            quality,
            contracts: contracts
                .iter()
                .map(|contract| contract_metadata(contract, roll))
                .collect(),
        }
    }
}

fn contract_metadata(contract: &Contract, roll: &RollCalendar) -> ContractMetadata {
    let id = contract.id();
    let roll_in = if roll.opening().priced == *id {
        Some(roll.start_date())
    } else {
        roll.events()
            .iter()
            .find(|event| event.priced_next == *id)
            .map(|event| event.date)
    };
    let roll_out = roll
        .events()
        .iter()
        .find(|event| event.priced_previous == *id)
        .map(|event| event.date);

    ContractMetadata {
        contract: id.clone(),
        expiry: contract.expiry(),
        first_notice: contract.first_notice(),
        first_date: contract.price_range().map(|range| range.first),
        last_date: contract.price_range().map(|range| range.last),
        observation_count: contract.observation_count(),
        roll_in,
        roll_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::MonthCode;
    use crate::domain::roll::{ContractsInForce, RollEvent};
    use chrono::{Datelike, Weekday};
    use rust_decimal_macros::dec;

    struct Weekdays;

    impl HolidayCalendar for Weekdays {
        fn is_business_day(&self, date: NaiveDate) -> bool {
            !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn es(month: MonthCode) -> ContractId {
        ContractId::new("ES", 2025, month)
    }

    fn weekday_prices(first: NaiveDate, last: NaiveDate, skip: &[NaiveDate]) -> Vec<PriceObservation> {
        first
            .iter_days()
            .take_while(|date| *date <= last)
            .filter(|date| Weekdays.is_business_day(*date) && !skip.contains(date))
            .map(|date| PriceObservation::new(date, dec!(5000)).with_volume(1_000))
            .collect()
    }

    fn fixture(skip: &[NaiveDate]) -> (RollCalendar, ContractUniverse, PriceHistory) {
        let h = weekday_prices(d(2025, 1, 2), d(2025, 3, 21), skip);
        let m = weekday_prices(d(2025, 2, 3), d(2025, 4, 30), skip);

        let mut universe = ContractUniverse::new();
        universe
            .register(Contract::new(es(MonthCode::H), d(2025, 3, 21)).with_observations(&h))
            .unwrap();
        universe
            .register(Contract::new(es(MonthCode::M), d(2025, 6, 20)).with_observations(&m))
            .unwrap();

        let mut history = PriceHistory::new();
        history.insert(es(MonthCode::H), h);
        history.insert(es(MonthCode::M), m);

        let calendar = RollCalendar::from_parts(
            "ES",
            d(2025, 1, 2),
            d(2025, 4, 30),
            ContractsInForce {
                priced: es(MonthCode::H),
                held: es(MonthCode::H),
                carry: ContractId::new("ES", 2024, MonthCode::Z),
            },
            vec![RollEvent {
                date: d(2025, 3, 14),
                priced_previous: es(MonthCode::H),
                priced_next: es(MonthCode::M),
                held_previous: es(MonthCode::H),
                held_next: es(MonthCode::M),
                carry: es(MonthCode::H),
            }],
            Vec::new(),
        )
        .unwrap();

        (calendar, universe, history)
    }

    #[test]
    fn test_stitched_series_follows_segments() {
        let (calendar, _, history) = fixture(&[]);
        let config = QualityConfig::default();
        let aggregator = MetadataAggregator::new(&Weekdays, &config);

        let series = aggregator.stitched_series(&calendar, &history);
        let stats = aggregator.series_stats(&series);
        assert_eq!(series.first().unwrap().date, d(2025, 1, 2));
        assert_eq!(series.last().unwrap().date, d(2025, 4, 30));
        assert_eq!(stats.observed_business_days, stats.expected_business_days);
        assert_eq!(stats.longest_gap_days, 0);
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_gap_is_measured_in_business_days() {
        // Thursday to the following Tuesday: Fri and Mon are missing.
        let (calendar, universe, history) = fixture(&[d(2025, 4, 4), d(2025, 4, 7)]);
        let config = QualityConfig::default();
        let metadata = MetadataAggregator::new(&Weekdays, &config).aggregate(
            &calendar,
            &universe,
            &history,
            InstrumentReference::default(),
        );
        assert_eq!(metadata.longest_gap_days, 2);
        assert!(metadata.quality.gap_within_limit);
        assert!(metadata.quality.score > 95.0);
    }

    #[test]
    fn test_contract_rows_carry_roll_dates() {
        let (calendar, universe, history) = fixture(&[]);
        let config = QualityConfig::default();
        let metadata = MetadataAggregator::new(&Weekdays, &config).aggregate(
            &calendar,
            &universe,
            &history,
            InstrumentReference {
                exchange: "CME".to_string(),
                ..Default::default()
            },
        );

        assert_eq!(metadata.contract_count, 2);
        assert_eq!(metadata.contracts[0].roll_in, Some(d(2025, 1, 2)));
        assert_eq!(metadata.contracts[0].roll_out, Some(d(2025, 3, 14)));
        assert_eq!(metadata.contracts[1].roll_in, Some(d(2025, 3, 14)));
        assert_eq!(metadata.contracts[1].roll_out, None);

        let rows = metadata.merged_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["exchange"], "CME");
        // Contract-level observation count wins over the instrument's.
        assert_eq!(
            rows[0]["observation_count"],
            metadata.contracts[0].observation_count.to_string()
        );
        assert_eq!(rows[1]["roll_in"], "2025-03-14");
    }
}
