//! Roll calendar construction.
//!
//! The builder walks an instrument's priced-cycle contracts in expiry
//! order. It skips contracts that cannot be priced and bridges past
//! infeasible transitions, recording a [`RollWarning`] for each. A second
//! pass picks the held contract for every roll, and the carry contract is
//! derived from the priced successor.

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::calendar::HolidayCalendar;
use crate::domain::contract::{Contract, ContractId, ContractUniverse, PriceAvailability};
use crate::error::RollError;

use super::{
    ContractsInForce, RollCalendar, RollCycleResolver, RollDateCalculator, RollEvent,
    RollParameters, RollWarning,
};

/// Upper bound on cycle steps walked between two accepted contracts when
/// looking for unregistered members.
const MAX_MISSING_WALK_CYCLES: usize = 4;

/// Builds a [`RollCalendar`] for one instrument.
pub struct RollCalendarBuilder<'a> {
    calendar: &'a dyn HolidayCalendar,
    prices: &'a dyn PriceAvailability,
    params: &'a RollParameters,
}

/// Priced series before held and carry contracts are attached.
struct PricedChain<'c> {
    contracts: Vec<&'c Contract>,
    roll_dates: Vec<NaiveDate>,
}

impl<'a> RollCalendarBuilder<'a> {
    /// Create a builder for one instrument's parameters.
    #[must_use]
    pub fn new(
        calendar: &'a dyn HolidayCalendar,
        prices: &'a dyn PriceAvailability,
        params: &'a RollParameters,
    ) -> Self {
        Self {
            calendar,
            prices,
            params,
        }
    }

    fn calculator(&self) -> RollDateCalculator<'a> {
        RollDateCalculator::new(self.calendar, self.prices, self.params)
    }

    /// Build the calendar.
    ///
    /// # Errors
    ///
    /// - [`RollError::NoContracts`] if no priced-cycle contract has prices
    /// - [`RollError::Cancelled`] if `cancel` is set during the build
    /// - [`RollError::RollCalendarConsistency`] if the result breaks an
    ///   ordering invariant
    /// - [`RollError::NoSuchCycleMember`] if a carry or held walk leaves its
    ///   cycle
    pub fn build(
        &self,
        universe: &ContractUniverse,
        cancel: &CancellationToken,
    ) -> Result<RollCalendar, RollError> {
        let instrument = self.params.instrument();
        let all = universe.contracts_for(instrument);
        let mut warnings = Vec::new();

        let candidates = self.priced_candidates(all, &mut warnings);
        if candidates.is_empty() {
            return Err(RollError::NoContracts {
                instrument: instrument.to_string(),
            });
        }

        let chain = self.priced_chain(&candidates, universe, cancel, &mut warnings)?;
        let calendar = self.assemble(all, &chain, warnings)?;

        debug!(
            instrument,
            rolls = calendar.events().len(),
            warnings = calendar.warnings().len(),
            start = %calendar.start_date(),
            end = %calendar.end_date(),
            "Roll calendar built"
        );
        Ok(calendar)
    }

    /// Priced-cycle contracts with prices, in expiry order.
    fn priced_candidates<'c>(
        &self,
        all: &'c [Contract],
        warnings: &mut Vec<RollWarning>,
    ) -> Vec<&'c Contract> {
        let cycle = self.params.priced_cycle();
        all.iter()
            .filter(|contract| cycle.contains(contract.month()))
            .filter(|contract| {
                if contract.has_prices() {
                    return true;
                }
                warn!(contract = %contract.id(), "Skipping contract without price data");
                warnings.push(RollWarning::NoPriceData {
                    contract: contract.id().clone(),
                });
                false
            })
            .collect()
    }

    fn priced_chain<'c>(
        &self,
        candidates: &[&'c Contract],
        universe: &ContractUniverse,
        cancel: &CancellationToken,
        warnings: &mut Vec<RollWarning>,
    ) -> Result<PricedChain<'c>, RollError> {
        let calculator = self.calculator();
        let last_index = candidates.len() - 1;

        let start = (0..last_index)
            .find(|&index| {
                !Self::is_dead_end(&calculator, candidates[index], &candidates[index + 1..])
            })
            .unwrap_or(last_index);
        for skipped in &candidates[..start] {
            let date = calculator.scheduled(skipped).date;
            warn!(contract = %skipped.id(), %date, "Leading contract cannot roll out");
            warnings.push(RollWarning::CannotRollOut {
                contract: skipped.id().clone(),
                date,
            });
        }

        let mut current = candidates[start];
        let mut chain = PricedChain {
            contracts: vec![current],
            roll_dates: Vec::new(),
        };
        let mut last_date = current
            .price_range()
            .map_or(NaiveDate::MIN, |range| range.first);

        for (index, &candidate) in candidates.iter().enumerate().skip(start + 1) {
            if cancel.is_cancelled() {
                return Err(RollError::Cancelled {
                    instrument: self.params.instrument().to_string(),
                });
            }

            let roll = match calculator.roll_date(current, candidate) {
                Ok(roll) => roll,
                Err(RollError::InfeasibleRoll {
                    from,
                    to,
                    date,
                    reason,
                }) => {
                    warn!(%from, %to, %date, %reason, "Bridging infeasible roll");
                    warnings.push(RollWarning::InfeasibleRoll {
                        from,
                        to,
                        date,
                        reason,
                    });
                    continue;
                }
                Err(RollError::NoPriceData { contract }) => {
                    warnings.push(RollWarning::NoPriceData { contract });
                    continue;
                }
                Err(err) => return Err(err),
            };

            if roll.date <= last_date {
                warn!(from = %current.id(), to = %candidate.id(), date = %roll.date, "Roll does not follow previous roll");
                warnings.push(RollWarning::InfeasibleRoll {
                    from: current.id().clone(),
                    to: candidate.id().clone(),
                    date: roll.date,
                    reason: format!("not after previous roll on {last_date}"),
                });
                continue;
            }

            let later = &candidates[index + 1..];
            if Self::is_dead_end(&calculator, candidate, later)
                && later.iter().any(|next| {
                    matches!(calculator.roll_date(current, next), Ok(roll) if roll.date > last_date)
                })
            {
                let date = calculator.scheduled(candidate).date;
                warn!(contract = %candidate.id(), %date, "Successor cannot roll out, bridging");
                warnings.push(RollWarning::CannotRollOut {
                    contract: candidate.id().clone(),
                    date,
                });
                continue;
            }

            if roll.missing_first_notice {
                warnings.push(RollWarning::MissingFirstNotice {
                    contract: current.id().clone(),
                });
            }
            self.record_missing(current.id(), candidate.id(), universe, warnings);

            debug!(from = %current.id(), to = %candidate.id(), date = %roll.date, "Roll accepted");
            chain.roll_dates.push(roll.date);
            chain.contracts.push(candidate);
            last_date = roll.date;
            current = candidate;
        }

        Ok(chain)
    }

    /// A contract that cannot roll out is only dropped while a later
    /// candidate still trades on its scheduled roll-out date. Otherwise the
    /// data ends before that date and the contract stays live.
    fn is_dead_end(
        calculator: &RollDateCalculator<'_>,
        contract: &Contract,
        later: &[&Contract],
    ) -> bool {
        if calculator.can_roll_out(contract) {
            return false;
        }
        let roll_out = calculator.scheduled(contract).date;
        later.iter().any(|next| {
            next.price_range()
                .is_some_and(|range| range.contains(roll_out))
        })
    }

    /// Warn about cycle members strictly between `from` and `to` that are
    /// not registered at all.
    fn record_missing(
        &self,
        from: &ContractId,
        to: &ContractId,
        universe: &ContractUniverse,
        warnings: &mut Vec<RollWarning>,
    ) {
        let cycle = self.params.priced_cycle();
        let mut id = from.clone();
        for _ in 0..cycle.len() * MAX_MISSING_WALK_CYCLES {
            let Ok(next) = RollCycleResolver::next(&id, cycle) else {
                return;
            };
            if next >= *to {
                return;
            }
            if universe.get(&next).is_none() {
                warnings.push(RollWarning::MissingContract {
                    contract: next.clone(),
                });
            }
            id = next;
        }
    }

    /// Attach held and carry contracts and validate the result.
    fn assemble(
        &self,
        all: &[Contract],
        chain: &PricedChain<'_>,
        warnings: Vec<RollWarning>,
    ) -> Result<RollCalendar, RollError> {
        let instrument = self.params.instrument();
        let inconsistent = |message: String| RollError::RollCalendarConsistency {
            instrument: instrument.to_string(),
            message,
        };

        let (Some(first), Some(last)) = (chain.contracts.first(), chain.contracts.last()) else {
            return Err(RollError::NoContracts {
                instrument: instrument.to_string(),
            });
        };
        let start_date = first
            .price_range()
            .ok_or_else(|| RollError::NoPriceData {
                contract: first.id().clone(),
            })?
            .first;
        let end_date = last
            .price_range()
            .ok_or_else(|| RollError::NoPriceData {
                contract: last.id().clone(),
            })?
            .last;

        for pair in chain.contracts.windows(2) {
            if pair[1].expiry() <= pair[0].expiry() {
                return Err(inconsistent(format!(
                    "{} expires {} which does not follow {} expiring {}",
                    pair[1].id(),
                    pair[1].expiry(),
                    pair[0].id(),
                    pair[0].expiry()
                )));
            }
        }

        let priced_cycle = self.params.priced_cycle();
        let carry_offset = self.params.carry_offset();
        let opening = ContractsInForce {
            priced: first.id().clone(),
            held: first.id().clone(),
            carry: RollCycleResolver::step(first.id(), priced_cycle, carry_offset)?,
        };

        let mut events = Vec::with_capacity(chain.roll_dates.len());
        let mut held_previous = *first;
        for (k, date) in chain.roll_dates.iter().enumerate() {
            let priced_previous = chain.contracts[k];
            let priced_next = chain.contracts[k + 1];
            let hold_until = chain.roll_dates.get(k + 1).copied().unwrap_or(end_date);
            let held_next = self.held_successor(all, held_previous, priced_next, *date, hold_until)?;

            events.push(RollEvent {
                date: *date,
                priced_previous: priced_previous.id().clone(),
                priced_next: priced_next.id().clone(),
                held_previous: held_previous.id().clone(),
                held_next: held_next.id().clone(),
                carry: RollCycleResolver::step(priced_next.id(), priced_cycle, carry_offset)?,
            });
            held_previous = held_next;
        }

        RollCalendar::from_parts(instrument, start_date, end_date, opening, events, warnings)
    }

    /// First held-cycle contract after `previous` that is priced on `date`
    /// and keeps prices until `hold_until`; `priced_next` if none qualifies.
    fn held_successor<'c>(
        &self,
        all: &'c [Contract],
        previous: &'c Contract,
        priced_next: &'c Contract,
        date: NaiveDate,
        hold_until: NaiveDate,
    ) -> Result<&'c Contract, RollError> {
        let held_cycle = self.params.held_cycle();
        let mut cursor = previous;
        for _ in 0..held_cycle.len() * MAX_MISSING_WALK_CYCLES {
            let Some(candidate) = RollCycleResolver::next_in(cursor, held_cycle, all)? else {
                break;
            };
            if candidate.expiry() > priced_next.expiry() {
                break;
            }
            let lasts = candidate
                .price_range()
                .is_some_and(|range| range.last >= hold_until);
            if lasts && self.prices.has_price(candidate.id(), date) {
                return Ok(candidate);
            }
            cursor = candidate;
        }
        Ok(priced_next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::{MonthCode, PriceHistory, PriceObservation};
    use crate::domain::roll::RollParameterConfig;
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

    fn es(year: i32, month: MonthCode) -> ContractId {
        ContractId::new("ES", year, month)
    }

    struct Fixture {
        universe: ContractUniverse,
        history: PriceHistory,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                universe: ContractUniverse::new(),
                history: PriceHistory::new(),
            }
        }

        fn add(&mut self, id: ContractId, expiry: NaiveDate, prices: Option<(NaiveDate, NaiveDate)>) {
            let observations: Vec<PriceObservation> = prices
                .map(|(first, last)| {
                    first
                        .iter_days()
                        .take_while(|date| *date <= last)
                        .filter(|date| Weekdays.is_business_day(*date))
                        .map(|date| PriceObservation::new(date, dec!(100)))
                        .collect()
                })
                .unwrap_or_default();
            self.history.insert(id.clone(), observations.clone());
            self.universe
                .register(Contract::new(id, expiry).with_observations(&observations))
                .unwrap();
        }

        fn build(&self, raw: &RollParameterConfig) -> Result<RollCalendar, RollError> {
            let params = RollParameters::from_config("ES", raw).unwrap();
            RollCalendarBuilder::new(&Weekdays, &self.history, &params)
                .build(&self.universe, &CancellationToken::new())
        }
    }

    /// Quarterly ES contracts, each trading for roughly six months.
    fn quarterly_fixture() -> Fixture {
        let mut fixture = Fixture::new();
        fixture.add(es(2025, MonthCode::H), d(2025, 3, 21), Some((d(2024, 9, 20), d(2025, 3, 21))));
        fixture.add(es(2025, MonthCode::M), d(2025, 6, 20), Some((d(2024, 12, 20), d(2025, 6, 20))));
        fixture.add(es(2025, MonthCode::U), d(2025, 9, 19), Some((d(2025, 3, 21), d(2025, 9, 19))));
        fixture.add(es(2025, MonthCode::Z), d(2025, 12, 19), Some((d(2025, 6, 20), d(2025, 12, 19))));
        fixture
    }

    #[test]
    fn test_quarterly_calendar() {
        let calendar = quarterly_fixture()
            .build(&RollParameterConfig::new("HMUZ", -5, -1))
            .unwrap();

        let dates: Vec<NaiveDate> = calendar.events().iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![d(2025, 3, 14), d(2025, 6, 13), d(2025, 9, 12)]);
        assert_eq!(calendar.start_date(), d(2024, 9, 20));
        assert_eq!(calendar.end_date(), d(2025, 12, 19));
        assert_eq!(calendar.opening().carry, es(2024, MonthCode::Z));
        assert_eq!(calendar.events()[0].carry, es(2025, MonthCode::H));
        assert_eq!(calendar.events()[0].held_next, es(2025, MonthCode::M));
        assert!(calendar.warnings().is_empty());
    }

    #[test]
    fn test_truncated_panel_keeps_live_front_contract() {
        // Panel ends on 2025-08-01, before U25's roll-out date.
        let mut fixture = Fixture::new();
        fixture.add(es(2025, MonthCode::H), d(2025, 3, 21), Some((d(2024, 9, 20), d(2025, 3, 21))));
        fixture.add(es(2025, MonthCode::M), d(2025, 6, 20), Some((d(2024, 12, 20), d(2025, 6, 20))));
        fixture.add(es(2025, MonthCode::U), d(2025, 9, 19), Some((d(2025, 3, 21), d(2025, 8, 1))));
        fixture.add(es(2025, MonthCode::Z), d(2025, 12, 19), Some((d(2025, 6, 20), d(2025, 8, 1))));

        let calendar = fixture
            .build(&RollParameterConfig::new("HMUZ", -5, -1))
            .unwrap();

        let dates: Vec<NaiveDate> = calendar.events().iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![d(2025, 3, 14), d(2025, 6, 13)]);
        assert_eq!(calendar.events()[1].priced_next, es(2025, MonthCode::U));
        assert_eq!(
            calendar.contracts_on(d(2025, 7, 15)).unwrap().priced,
            es(2025, MonthCode::U)
        );
        assert_eq!(calendar.end_date(), d(2025, 8, 1));
        assert!(
            !calendar
                .warnings()
                .iter()
                .any(|w| matches!(w, RollWarning::CannotRollOut { .. }))
        );
    }

    #[test]
    fn test_truncated_panel_keeps_leading_contract() {
        let mut fixture = Fixture::new();
        fixture.add(es(2025, MonthCode::U), d(2025, 9, 19), Some((d(2025, 3, 21), d(2025, 8, 1))));
        fixture.add(es(2025, MonthCode::Z), d(2025, 12, 19), Some((d(2025, 6, 20), d(2025, 8, 1))));

        let calendar = fixture
            .build(&RollParameterConfig::new("HMUZ", -5, -1))
            .unwrap();

        assert!(calendar.events().is_empty());
        assert_eq!(calendar.opening().priced, es(2025, MonthCode::U));
        assert_eq!(calendar.start_date(), d(2025, 3, 21));
    }

    #[test]
    fn test_successor_dead_before_its_roll_is_skipped() {
        // U25 stops trading in August while Z25 trades through its roll.
        let mut fixture = Fixture::new();
        fixture.add(es(2025, MonthCode::H), d(2025, 3, 21), Some((d(2024, 9, 20), d(2025, 3, 21))));
        fixture.add(es(2025, MonthCode::M), d(2025, 6, 20), Some((d(2024, 12, 20), d(2025, 6, 20))));
        fixture.add(es(2025, MonthCode::U), d(2025, 9, 19), Some((d(2025, 3, 21), d(2025, 8, 15))));
        fixture.add(es(2025, MonthCode::Z), d(2025, 12, 19), Some((d(2025, 3, 21), d(2025, 12, 19))));

        let calendar = fixture
            .build(&RollParameterConfig::new("HMUZ", -5, -1))
            .unwrap();

        assert_eq!(calendar.events()[1].priced_next, es(2025, MonthCode::Z));
        assert!(calendar.warnings().contains(&RollWarning::CannotRollOut {
            contract: es(2025, MonthCode::U),
            date: d(2025, 9, 12),
        }));
    }

    #[test]
    fn test_contract_without_prices_is_bridged() {
        let mut fixture = Fixture::new();
        fixture.add(es(2025, MonthCode::H), d(2025, 3, 21), Some((d(2024, 9, 20), d(2025, 3, 21))));
        fixture.add(es(2025, MonthCode::M), d(2025, 6, 20), None);
        fixture.add(es(2025, MonthCode::U), d(2025, 9, 19), Some((d(2024, 12, 20), d(2025, 9, 19))));

        let calendar = fixture
            .build(&RollParameterConfig::new("HMUZ", -5, -1))
            .unwrap();

        assert_eq!(calendar.events().len(), 1);
        assert_eq!(calendar.events()[0].priced_next, es(2025, MonthCode::U));
        assert_eq!(calendar.events()[0].date, d(2025, 3, 14));
        assert!(calendar.warnings().contains(&RollWarning::NoPriceData {
            contract: es(2025, MonthCode::M)
        }));
    }

    #[test]
    fn test_infeasible_successor_is_bridged() {
        let mut fixture = Fixture::new();
        fixture.add(es(2025, MonthCode::H), d(2025, 3, 21), Some((d(2024, 9, 20), d(2025, 3, 21))));
        // M25 only starts trading after H25's roll date.
        fixture.add(es(2025, MonthCode::M), d(2025, 6, 20), Some((d(2025, 3, 18), d(2025, 6, 20))));
        fixture.add(es(2025, MonthCode::U), d(2025, 9, 19), Some((d(2024, 12, 20), d(2025, 9, 19))));

        let calendar = fixture
            .build(&RollParameterConfig::new("HMUZ", -5, -1))
            .unwrap();

        assert_eq!(calendar.events().len(), 1);
        assert_eq!(calendar.events()[0].priced_next, es(2025, MonthCode::U));
        assert!(
            calendar
                .warnings()
                .iter()
                .any(|w| matches!(w, RollWarning::InfeasibleRoll { to, .. } if *to == es(2025, MonthCode::M)))
        );
    }

    #[test]
    fn test_unregistered_cycle_member_is_reported() {
        let mut fixture = Fixture::new();
        fixture.add(es(2025, MonthCode::H), d(2025, 3, 21), Some((d(2024, 9, 20), d(2025, 3, 21))));
        fixture.add(es(2025, MonthCode::U), d(2025, 9, 19), Some((d(2024, 12, 20), d(2025, 9, 19))));

        let calendar = fixture
            .build(&RollParameterConfig::new("HMUZ", -5, -1))
            .unwrap();

        assert_eq!(
            calendar.warnings(),
            &[RollWarning::MissingContract {
                contract: es(2025, MonthCode::M)
            }]
        );
    }

    #[test]
    fn test_no_priced_contracts() {
        let mut fixture = Fixture::new();
        fixture.add(es(2025, MonthCode::H), d(2025, 3, 21), None);

        let err = fixture
            .build(&RollParameterConfig::new("HMUZ", -5, -1))
            .unwrap_err();
        assert_eq!(
            err,
            RollError::NoContracts {
                instrument: "ES".to_string()
            }
        );
    }

    #[test]
    fn test_held_series_skips_short_lived_month() {
        let mut fixture = quarterly_fixture();
        // K25 trades only briefly, so the held series goes straight to M25.
        fixture.add(es(2025, MonthCode::K), d(2025, 5, 16), Some((d(2025, 3, 3), d(2025, 4, 30))));

        let mut raw = RollParameterConfig::new("HMUZ", -5, -1);
        raw.hold_rollcycle = "HKMUZ".to_string();
        let calendar = fixture.build(&raw).unwrap();

        assert_eq!(calendar.events()[0].held_next, es(2025, MonthCode::M));
    }

    #[test]
    fn test_held_series_takes_nearer_month_when_it_lasts() {
        let mut fixture = quarterly_fixture();
        fixture.add(es(2025, MonthCode::K), d(2025, 6, 13), Some((d(2025, 3, 3), d(2025, 6, 13))));

        let mut raw = RollParameterConfig::new("HMUZ", -5, -1);
        raw.hold_rollcycle = "HKMUZ".to_string();
        let calendar = fixture.build(&raw).unwrap();

        let first = &calendar.events()[0];
        assert_eq!(first.priced_next, es(2025, MonthCode::M));
        assert_eq!(first.held_next, es(2025, MonthCode::K));
        assert_eq!(calendar.events()[1].held_previous, es(2025, MonthCode::K));
    }

    #[test]
    fn test_cancelled_build_returns_no_calendar() {
        let fixture = quarterly_fixture();
        let params = RollParameters::from_config("ES", &RollParameterConfig::new("HMUZ", -5, -1)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = RollCalendarBuilder::new(&Weekdays, &fixture.history, &params)
            .build(&fixture.universe, &cancel)
            .unwrap_err();
        assert!(matches!(err, RollError::Cancelled { .. }));
    }
}
