//! Application Ports (Driven)
//!
//! Ports define how the engine reads prices, holidays, roll parameters and
//! reference data. All ports are synchronous and `Send + Sync` so builds
//! can share them across threads.

mod price_panel_port;
mod reference_data_port;
mod roll_parameter_port;

pub use crate::domain::calendar::HolidayCalendar;
pub use price_panel_port::{ContractListing, PanelPrices, PricePanelSource, SourceError};
pub use reference_data_port::ReferenceDataSource;
#[cfg(test)]
pub use roll_parameter_port::MockRollParameterSource;
pub use roll_parameter_port::RollParameterSource;
