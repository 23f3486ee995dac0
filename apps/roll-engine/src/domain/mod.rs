//! Domain Layer
//!
//! Business logic with no infrastructure dependencies.
//!
//! # Bounded Contexts
//!
//! - [`contract`]: Contract identities, price observations and the contract universe
//! - [`roll`]: Roll cycles, parameters and roll calendar construction
//! - [`metadata`]: Instrument reference data and data quality scoring
//! - [`calendar`]: Business-day calendar abstraction

pub mod calendar;
pub mod contract;
pub mod metadata;
pub mod roll;
