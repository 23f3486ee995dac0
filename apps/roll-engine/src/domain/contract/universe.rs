//! Registry of known contracts per instrument.

use std::collections::HashMap;

use tracing::debug;

use super::{Contract, ContractId, PriceRange};
use crate::error::RollError;

/// Per-instrument set of contracts with expiry dates and price ranges.
///
/// Contracts for one instrument are kept sorted by expiry (ties broken by
/// identity) so that lookups in roll order are cheap.
#[derive(Debug, Clone, Default)]
pub struct ContractUniverse {
    by_instrument: HashMap<String, Vec<Contract>>,
}

impl ContractUniverse {
    /// Create an empty universe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contract.
    ///
    /// Registering an identity twice with the same expiry is a no-op; a
    /// different expiry is a [`RollError::DuplicateContract`].
    pub fn register(&mut self, contract: Contract) -> Result<(), RollError> {
        let contracts = self
            .by_instrument
            .entry(contract.instrument().to_string())
            .or_default();

        if let Some(existing) = contracts.iter().find(|c| c.id() == contract.id()) {
            if existing.expiry() != contract.expiry() {
                return Err(RollError::DuplicateContract {
                    contract: contract.id().clone(),
                    existing: existing.expiry(),
                    conflicting: contract.expiry(),
                });
            }
            debug!(contract = %contract.id(), "Contract already registered");
            return Ok(());
        }

        let at = contracts
            .partition_point(|c| (c.expiry(), c.id()) < (contract.expiry(), contract.id()));
        contracts.insert(at, contract);
        Ok(())
    }

    /// Contracts of an instrument ordered by expiry ascending.
    #[must_use]
    pub fn contracts_for(&self, instrument: &str) -> &[Contract] {
        self.by_instrument
            .get(&instrument.to_uppercase())
            .map_or(&[], Vec::as_slice)
    }

    /// Look up a contract by identity.
    #[must_use]
    pub fn get(&self, id: &ContractId) -> Option<&Contract> {
        self.by_instrument
            .get(id.instrument())
            .and_then(|contracts| contracts.iter().find(|c| c.id() == id))
    }

    /// First and last price dates for a contract.
    pub fn price_range_for(&self, id: &ContractId) -> Result<PriceRange, RollError> {
        self.get(id)
            .and_then(Contract::price_range)
            .ok_or_else(|| RollError::NoPriceData {
                contract: id.clone(),
            })
    }

    /// Instruments with at least one registered contract, sorted.
    #[must_use]
    pub fn instruments(&self) -> Vec<&str> {
        let mut instruments: Vec<&str> = self.by_instrument.keys().map(String::as_str).collect();
        instruments.sort_unstable();
        instruments
    }

    /// Number of contracts registered for an instrument.
    #[must_use]
    pub fn contract_count(&self, instrument: &str) -> usize {
        self.contracts_for(instrument).len()
    }
}
