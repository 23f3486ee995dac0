//! Per-contract price observations.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use super::{ContractId, PriceObservation};

/// Answers whether a contract has a price on a given date.
pub trait PriceAvailability {
    /// True if `contract` has an observation on `date`.
    fn has_price(&self, contract: &ContractId, date: NaiveDate) -> bool;
}

/// Price observations keyed by contract, each series ordered by date.
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    series: HashMap<ContractId, BTreeMap<NaiveDate, PriceObservation>>,
}

impl PriceHistory {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add observations for a contract. A later observation for the same
    /// date replaces the earlier one.
    pub fn insert(&mut self, contract: ContractId, observations: impl IntoIterator<Item = PriceObservation>) {
        let series = self.series.entry(contract).or_default();
        for observation in observations {
            series.insert(observation.date, observation);
        }
    }

    /// Observations for a contract in date order.
    pub fn observations(&self, contract: &ContractId) -> impl Iterator<Item = &PriceObservation> {
        self.series
            .get(contract)
            .into_iter()
            .flat_map(BTreeMap::values)
    }

    /// Observations for a contract within `[from, until)`; `until = None`
    /// means no upper bound.
    pub fn observations_between(
        &self,
        contract: &ContractId,
        from: NaiveDate,
        until: Option<NaiveDate>,
    ) -> impl Iterator<Item = &PriceObservation> {
        self.series.get(contract).into_iter().flat_map(move |series| {
            series
                .range(from..)
                .take_while(move |(date, _)| until.is_none_or(|until| **date < until))
                .map(|(_, observation)| observation)
        })
    }

    /// Number of observations for a contract.
    #[must_use]
    pub fn len_for(&self, contract: &ContractId) -> usize {
        self.series.get(contract).map_or(0, BTreeMap::len)
    }

    /// Whether the history holds no observations at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.values().all(BTreeMap::is_empty)
    }
}

impl PriceAvailability for PriceHistory {
    fn has_price(&self, contract: &ContractId, date: NaiveDate) -> bool {
        self.series
            .get(contract)
            .is_some_and(|series| series.contains_key(&date))
    }
}
