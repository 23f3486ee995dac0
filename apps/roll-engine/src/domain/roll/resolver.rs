//! Predecessor / successor contract identities within a roll cycle.

use crate::domain::contract::{Contract, ContractId};
use crate::error::RollError;

use super::RollCycle;

/// Walks a [`RollCycle`] forwards and backwards, carrying the year across
/// the wrap point.
#[derive(Debug, Clone, Copy, Default)]
pub struct RollCycleResolver;

impl RollCycleResolver {
    /// Successor of `contract` in `cycle`.
    ///
    /// # Errors
    ///
    /// [`RollError::NoSuchCycleMember`] if the month is not in the cycle.
    pub fn next(contract: &ContractId, cycle: &RollCycle) -> Result<ContractId, RollError> {
        Self::step(contract, cycle, 1)
    }

    /// Predecessor of `contract` in `cycle`.
    ///
    /// # Errors
    ///
    /// [`RollError::NoSuchCycleMember`] if the month is not in the cycle.
    pub fn previous(contract: &ContractId, cycle: &RollCycle) -> Result<ContractId, RollError> {
        Self::step(contract, cycle, -1)
    }

    /// Move `n` positions along the cycle; negative `n` moves backward.
    ///
    /// # Errors
    ///
    /// [`RollError::NoSuchCycleMember`] if the month is not in the cycle.
    pub fn step(contract: &ContractId, cycle: &RollCycle, n: i32) -> Result<ContractId, RollError> {
        let position = cycle
            .position(contract.month())
            .ok_or_else(|| RollError::NoSuchCycleMember {
                contract: contract.clone(),
                cycle: cycle.to_string(),
            })?;

        let len = i64::try_from(cycle.len()).unwrap_or(i64::MAX);
        let absolute = i64::try_from(position).unwrap_or(0) + i64::from(n);
        let year_shift = absolute.div_euclid(len);
        let index = usize::try_from(absolute.rem_euclid(len)).unwrap_or(0);

        let year = contract.year() + i32::try_from(year_shift).unwrap_or(0);
        let month = cycle.codes()[index];
        Ok(contract.with_year_month(year, month))
    }

    /// Successor of `current` resolved against registered `contracts`.
    ///
    /// The exact successor identity is used if it is registered and expires
    /// after `current`. Otherwise the contract with the successor's month
    /// code (year within one of the expected year) and the earliest expiry
    /// strictly after `current`'s is chosen. `Ok(None)` if neither exists.
    ///
    /// # Errors
    ///
    /// [`RollError::NoSuchCycleMember`] if `current`'s month is not in the
    /// cycle.
    pub fn next_in<'a>(
        current: &Contract,
        cycle: &RollCycle,
        contracts: &'a [Contract],
    ) -> Result<Option<&'a Contract>, RollError> {
        let target = Self::next(current.id(), cycle)?;

        let candidates = contracts.iter().filter(|c| {
            c.month() == target.month()
                && c.instrument() == target.instrument()
                && (c.id().year() - target.year()).abs() <= 1
                && c.expiry() > current.expiry()
        });

        let mut best: Option<&Contract> = None;
        for candidate in candidates {
            if candidate.id() == &target {
                return Ok(Some(candidate));
            }
            if best.is_none_or(|b| (candidate.expiry(), candidate.id()) < (b.expiry(), b.id())) {
                best = Some(candidate);
            }
        }
        Ok(best)
    }
}
