//! Roll Bounded Context
//!
//! Roll cycles, validated roll parameters, cycle resolution, roll date
//! calculation and the calendar builder that ties them together.

mod builder;
mod cycle;
mod date_calculator;
mod parameters;
mod resolver;
mod roll_calendar;

pub use builder::RollCalendarBuilder;
pub use cycle::RollCycle;
pub use date_calculator::{RollDate, RollDateCalculator};
pub use parameters::{ExpiryRollRule, RollParameterConfig, RollParameterStore, RollParameters};
pub use resolver::RollCycleResolver;
pub use roll_calendar::{
    ContractsInForce, PricedSegment, RollCalendar, RollCalendarRecord, RollEvent, RollWarning,
};
