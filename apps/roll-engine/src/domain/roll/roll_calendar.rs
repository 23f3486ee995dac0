//! Roll calendar artifact.
//!
//! A [`RollCalendar`] is an opening state followed by strictly increasing
//! [`RollEvent`]s. The per-date view (which contract is priced, held and
//! used as carry on a given date) is derived from it and never stored.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::calendar::HolidayCalendar;
use crate::domain::contract::ContractId;
use crate::error::RollError;

/// Non-fatal data problem recorded while building a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RollWarning {
    /// Contract has no price observations and was skipped.
    NoPriceData {
        /// Skipped contract.
        contract: ContractId,
    },
    /// Transition could not be priced and was bridged.
    InfeasibleRoll {
        /// Outgoing contract.
        from: ContractId,
        /// Rejected successor.
        to: ContractId,
        /// Scheduled roll date.
        date: NaiveDate,
        /// Reason the roll was rejected.
        reason: String,
    },
    /// Successor rejected because it has no prices on its own roll date.
    CannotRollOut {
        /// Rejected successor.
        contract: ContractId,
        /// Its scheduled roll-out date.
        date: NaiveDate,
    },
    /// A cycle member expected between two accepted contracts is not
    /// registered.
    MissingContract {
        /// Expected identity.
        contract: ContractId,
    },
    /// `FirstNotice` rule fell back to the expiry date.
    MissingFirstNotice {
        /// Contract without a first notice date.
        contract: ContractId,
    },
}

impl RollWarning {
    /// Stable reason code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::NoPriceData { .. } => "NO_PRICE_DATA",
            Self::InfeasibleRoll { .. } => "INFEASIBLE_ROLL",
            Self::CannotRollOut { .. } => "CANNOT_ROLL_OUT",
            Self::MissingContract { .. } => "MISSING_CONTRACT",
            Self::MissingFirstNotice { .. } => "MISSING_FIRST_NOTICE",
        }
    }

    /// Contract left out of the priced chain, if this warning drops one.
    #[must_use]
    pub const fn skipped_contract(&self) -> Option<&ContractId> {
        match self {
            Self::NoPriceData { contract }
            | Self::CannotRollOut { contract, .. }
            | Self::MissingContract { contract } => Some(contract),
            Self::InfeasibleRoll { to, .. } => Some(to),
            Self::MissingFirstNotice { .. } => None,
        }
    }
}

impl fmt::Display for RollWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPriceData { contract } => write!(f, "{contract}: no price data, skipped"),
            Self::InfeasibleRoll {
                from,
                to,
                date,
                reason,
            } => write!(f, "{from} -> {to} on {date} infeasible: {reason}"),
            Self::CannotRollOut { contract, date } => {
                write!(f, "{contract}: no price on own roll date {date}, skipped")
            }
            Self::MissingContract { contract } => write!(f, "{contract}: not registered"),
            Self::MissingFirstNotice { contract } => {
                write!(f, "{contract}: no first notice date, rolled from expiry")
            }
        }
    }
}

/// Contracts in force on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractsInForce {
    /// Contract whose prices form the continuous series.
    pub priced: ContractId,
    /// Contract held in the position series.
    pub held: ContractId,
    /// Contract used for carry calculations.
    pub carry: ContractId,
}

/// A single roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollEvent {
    /// First date on which the `next` contracts are in force.
    pub date: NaiveDate,
    /// Priced contract before the roll.
    pub priced_previous: ContractId,
    /// Priced contract from `date`.
    pub priced_next: ContractId,
    /// Held contract before the roll.
    pub held_previous: ContractId,
    /// Held contract from `date`.
    pub held_next: ContractId,
    /// Carry contract from `date`.
    pub carry: ContractId,
}

impl RollEvent {
    fn state(&self) -> ContractsInForce {
        ContractsInForce {
            priced: self.priced_next.clone(),
            held: self.held_next.clone(),
            carry: self.carry.clone(),
        }
    }
}

/// One row of the per-date view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollCalendarRecord {
    /// Date.
    pub date: NaiveDate,
    /// Priced contract.
    pub priced_contract: ContractId,
    /// Held contract.
    pub held_contract: ContractId,
    /// Carry contract.
    pub carry_contract: ContractId,
}

impl RollCalendarRecord {
    fn new(date: NaiveDate, state: &ContractsInForce) -> Self {
        Self {
            date,
            priced_contract: state.priced.clone(),
            held_contract: state.held.clone(),
            carry_contract: state.carry.clone(),
        }
    }

    fn state(&self) -> ContractsInForce {
        ContractsInForce {
            priced: self.priced_contract.clone(),
            held: self.held_contract.clone(),
            carry: self.carry_contract.clone(),
        }
    }
}

/// Window during which a contract is the priced contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedSegment {
    /// Priced contract.
    pub contract: ContractId,
    /// First date of the window.
    pub from: NaiveDate,
    /// Exclusive end, `None` for the final segment.
    pub until: Option<NaiveDate>,
}

/// Ordered roll schedule for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollCalendar {
    instrument: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    opening: ContractsInForce,
    events: Vec<RollEvent>,
    warnings: Vec<RollWarning>,
}

impl RollCalendar {
    /// Assemble a calendar, checking its ordering invariants.
    ///
    /// # Errors
    ///
    /// [`RollError::RollCalendarConsistency`] if event dates are not
    /// strictly increasing within `(start_date, end_date]` or events do not
    /// chain from the opening state.
    pub fn from_parts(
        instrument: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        opening: ContractsInForce,
        events: Vec<RollEvent>,
        warnings: Vec<RollWarning>,
    ) -> Result<Self, RollError> {
        let instrument = instrument.into();
        let inconsistent = |message: String| RollError::RollCalendarConsistency {
            instrument: instrument.clone(),
            message,
        };

        if end_date < start_date {
            return Err(inconsistent(format!(
                "end date {end_date} before start date {start_date}"
            )));
        }

        let mut previous_date = start_date;
        let mut state = opening.clone();
        for event in &events {
            if event.date <= previous_date {
                return Err(inconsistent(format!(
                    "roll on {} does not follow {previous_date}",
                    event.date
                )));
            }
            if event.priced_previous != state.priced || event.held_previous != state.held {
                return Err(inconsistent(format!(
                    "roll on {} does not chain from {} / {}",
                    event.date, state.priced, state.held
                )));
            }
            if event.priced_next == event.priced_previous {
                return Err(inconsistent(format!(
                    "roll on {} keeps priced contract {}",
                    event.date, event.priced_next
                )));
            }
            previous_date = event.date;
            state = event.state();
        }

        if previous_date > end_date {
            return Err(inconsistent(format!(
                "last roll on {previous_date} after end date {end_date}"
            )));
        }

        Ok(Self {
            instrument,
            start_date,
            end_date,
            opening,
            events,
            warnings,
        })
    }

    /// Rebuild a calendar from its records.
    ///
    /// The first row gives the opening state, every change of contracts
    /// between consecutive rows becomes an event and the last row's date is
    /// the end date. Warnings are not part of records and come back empty.
    ///
    /// # Errors
    ///
    /// [`RollError::RollCalendarConsistency`] if `rows` is empty, unordered
    /// or does not chain.
    pub fn from_records(
        instrument: impl Into<String>,
        rows: &[RollCalendarRecord],
    ) -> Result<Self, RollError> {
        let instrument = instrument.into();
        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            return Err(RollError::RollCalendarConsistency {
                instrument,
                message: "no records".to_string(),
            });
        };

        let opening = first.state();
        let mut state = opening.clone();
        let mut events = Vec::new();
        for row in &rows[1..] {
            let next = row.state();
            if next != state {
                events.push(RollEvent {
                    date: row.date,
                    priced_previous: state.priced.clone(),
                    priced_next: next.priced.clone(),
                    held_previous: state.held.clone(),
                    held_next: next.held.clone(),
                    carry: next.carry.clone(),
                });
                state = next;
            }
        }

        Self::from_parts(instrument, first.date, last.date, opening, events, Vec::new())
    }

    /// Instrument code.
    #[must_use]
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// First priced date.
    #[must_use]
    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Last priced date.
    #[must_use]
    pub const fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Contracts in force on the start date.
    #[must_use]
    pub const fn opening(&self) -> &ContractsInForce {
        &self.opening
    }

    /// Roll events in date order.
    #[must_use]
    pub fn events(&self) -> &[RollEvent] {
        &self.events
    }

    /// Data problems skipped during construction.
    #[must_use]
    pub fn warnings(&self) -> &[RollWarning] {
        &self.warnings
    }

    /// Distinct contracts dropped from the priced chain.
    #[must_use]
    pub fn skipped_contracts(&self) -> BTreeSet<&ContractId> {
        self.warnings
            .iter()
            .filter_map(RollWarning::skipped_contract)
            .collect()
    }

    /// Contracts in force after the last roll.
    #[must_use]
    pub fn final_state(&self) -> ContractsInForce {
        self.events
            .last()
            .map_or_else(|| self.opening.clone(), RollEvent::state)
    }

    /// Contracts in force on `date`, `None` outside `[start, end]`.
    #[must_use]
    pub fn contracts_on(&self, date: NaiveDate) -> Option<ContractsInForce> {
        if date < self.start_date || date > self.end_date {
            return None;
        }
        let applied = self.events.partition_point(|event| event.date <= date);
        Some(
            applied
                .checked_sub(1)
                .map_or_else(|| self.opening.clone(), |i| self.events[i].state()),
        )
    }

    /// Priced contracts with their half-open windows, in order.
    #[must_use]
    pub fn priced_segments(&self) -> Vec<PricedSegment> {
        let mut segments = Vec::with_capacity(self.events.len() + 1);
        let mut current = (self.opening.priced.clone(), self.start_date);
        for event in &self.events {
            segments.push(PricedSegment {
                contract: current.0,
                from: current.1,
                until: Some(event.date),
            });
            current = (event.priced_next.clone(), event.date);
        }
        segments.push(PricedSegment {
            contract: current.0,
            from: current.1,
            until: None,
        });
        segments
    }

    /// Compact records: the opening row, one row per roll and a closing
    /// row on the end date.
    #[must_use]
    pub fn records(&self) -> Vec<RollCalendarRecord> {
        let mut rows = Vec::with_capacity(self.events.len() + 2);
        rows.push(RollCalendarRecord::new(self.start_date, &self.opening));
        rows.extend(
            self.events
                .iter()
                .map(|event| RollCalendarRecord::new(event.date, &event.state())),
        );
        if rows.last().is_some_and(|row| row.date < self.end_date) {
            rows.push(RollCalendarRecord::new(self.end_date, &self.final_state()));
        }
        rows
    }

    /// One record per business day in `[start, end]`.
    #[must_use]
    pub fn daily_records(&self, calendar: &dyn HolidayCalendar) -> Vec<RollCalendarRecord> {
        let mut rows = Vec::new();
        let mut next_event = 0;
        let mut state = self.opening.clone();
        for date in self.start_date.iter_days().take_while(|d| *d <= self.end_date) {
            while let Some(event) = self.events.get(next_event).filter(|e| e.date <= date) {
                state = event.state();
                next_event += 1;
            }
            if calendar.is_business_day(date) {
                rows.push(RollCalendarRecord::new(date, &state));
            }
        }
        rows
    }
}
