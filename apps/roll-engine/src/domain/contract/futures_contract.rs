//! Dated futures contract and its price observations.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ContractId, MonthCode};

/// Day of month used when no expiry day offset is configured.
pub const DEFAULT_APPROX_EXPIRY_DAY: u32 = 15;

/// A single daily price observation for one contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Observation date.
    pub date: NaiveDate,
    /// Settlement / final price.
    pub price: Decimal,
    /// Traded volume, when the source carries it.
    #[serde(default)]
    pub volume: Option<u64>,
}

impl PriceObservation {
    /// Create an observation without volume.
    #[must_use]
    pub const fn new(date: NaiveDate, price: Decimal) -> Self {
        Self {
            date,
            price,
            volume: None,
        }
    }

    /// Attach a volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: u64) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// Span of dates on which a contract has prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    /// First observed price date.
    pub first: NaiveDate,
    /// Last observed price date.
    pub last: NaiveDate,
}

impl PriceRange {
    /// Whether `date` lies within the range (inclusive).
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first <= date && date <= self.last
    }
}

/// A dated, expiring instance of an instrument.
///
/// Built once from price-panel ingestion and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    id: ContractId,
    expiry: NaiveDate,
    first_notice: Option<NaiveDate>,
    price_range: Option<PriceRange>,
    observation_count: usize,
}

impl Contract {
    /// Create a contract with no price data attached.
    #[must_use]
    pub const fn new(id: ContractId, expiry: NaiveDate) -> Self {
        Self {
            id,
            expiry,
            first_notice: None,
            price_range: None,
            observation_count: 0,
        }
    }

    /// Set the first notice date.
    #[must_use]
    pub const fn with_first_notice(mut self, first_notice: Option<NaiveDate>) -> Self {
        self.first_notice = first_notice;
        self
    }

    /// Set the observed price range and observation count.
    #[must_use]
    pub const fn with_prices(mut self, range: Option<PriceRange>, observations: usize) -> Self {
        self.price_range = range;
        self.observation_count = if range.is_some() { observations } else { 0 };
        self
    }

    /// Set the price range from a set of observations.
    #[must_use]
    pub fn with_observations(self, observations: &[PriceObservation]) -> Self {
        let dates: BTreeSet<NaiveDate> = observations.iter().map(|o| o.date).collect();
        let range = dates
            .first()
            .zip(dates.last())
            .map(|(first, last)| PriceRange {
                first: *first,
                last: *last,
            });
        self.with_prices(range, dates.len())
    }

    /// Contract identity.
    #[must_use]
    pub const fn id(&self) -> &ContractId {
        &self.id
    }

    /// Instrument code.
    #[must_use]
    pub fn instrument(&self) -> &str {
        self.id.instrument()
    }

    /// Month code.
    #[must_use]
    pub const fn month(&self) -> MonthCode {
        self.id.month()
    }

    /// Expiry date.
    #[must_use]
    pub const fn expiry(&self) -> NaiveDate {
        self.expiry
    }

    /// First notice date, if the source reported one.
    #[must_use]
    pub const fn first_notice(&self) -> Option<NaiveDate> {
        self.first_notice
    }

    /// Observed price range, `None` if the contract never traded.
    #[must_use]
    pub const fn price_range(&self) -> Option<PriceRange> {
        self.price_range
    }

    /// Number of price observations.
    #[must_use]
    pub const fn observation_count(&self) -> usize {
        self.observation_count
    }

    /// Whether the contract has any prices.
    #[must_use]
    pub const fn has_prices(&self) -> bool {
        self.price_range.is_some()
    }

    /// Approximate expiry when the source gives none.
    ///
    /// Uses day `expiry_day` of the contract month (0 means the 15th),
    /// clamped to the length of the month.
    #[must_use]
    pub fn approximate_expiry(year: i32, month: MonthCode, expiry_day: u32) -> Option<NaiveDate> {
        let day = if expiry_day == 0 {
            DEFAULT_APPROX_EXPIRY_DAY
        } else {
            expiry_day
        };
        let first = NaiveDate::from_ymd_opt(year, month.month(), 1)?;
        let last_day = last_day_of_month(first)?;
        NaiveDate::from_ymd_opt(year, month.month(), day.min(last_day))
    }
}

fn last_day_of_month(first: NaiveDate) -> Option<u32> {
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    next_month.pred_opt().map(|d| d.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_with_observations_sets_range() {
        let observations = vec![
            PriceObservation::new(d(2025, 1, 3), dec!(100)),
            PriceObservation::new(d(2025, 1, 2), dec!(99)),
            PriceObservation::new(d(2025, 1, 6), dec!(101)),
        ];
        let contract = Contract::new(ContractId::new("ES", 2025, MonthCode::H), d(2025, 3, 21))
            .with_observations(&observations);

        let range = contract.price_range().unwrap();
        assert_eq!(range.first, d(2025, 1, 2));
        assert_eq!(range.last, d(2025, 1, 6));
        assert_eq!(contract.observation_count(), 3);
        assert!(range.contains(d(2025, 1, 4)));
        assert!(!range.contains(d(2025, 1, 7)));
    }

    #[test]
    fn test_duplicate_dates_count_once() {
        let observations = vec![
            PriceObservation::new(d(2025, 1, 2), dec!(99)),
            PriceObservation::new(d(2025, 1, 2), dec!(99.5)),
            PriceObservation::new(d(2025, 1, 3), dec!(100)),
        ];
        let contract = Contract::new(ContractId::new("ES", 2025, MonthCode::H), d(2025, 3, 21))
            .with_observations(&observations);

        assert_eq!(contract.observation_count(), 2);
        assert_eq!(contract.price_range().unwrap().last, d(2025, 1, 3));
    }

    #[test]
    fn test_no_observations_means_no_range() {
        let contract = Contract::new(ContractId::new("ES", 2025, MonthCode::H), d(2025, 3, 21))
            .with_observations(&[]);
        assert!(!contract.has_prices());
        assert_eq!(contract.observation_count(), 0);
    }

    #[test]
    fn test_approximate_expiry() {
        assert_eq!(
            Contract::approximate_expiry(2024, MonthCode::H, 0),
            Some(d(2024, 3, 15))
        );
        assert_eq!(
            Contract::approximate_expiry(2024, MonthCode::G, 31),
            Some(d(2024, 2, 29))
        );
        assert_eq!(
            Contract::approximate_expiry(2024, MonthCode::Z, 20),
            Some(d(2024, 12, 20))
        );
    }
}
