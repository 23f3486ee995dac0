//! Infrastructure Layer
//!
//! Adapters implementing the ports defined in the application layer:
//!
//! - `calendar/`: Weekday holiday calendar with explicit market holidays
//! - `panel/`: In-memory price panel loaded from a JSON snapshot
//! - `params/`: Roll parameters read from the YAML configuration
//! - `reference/`: Static instrument reference data

pub mod calendar;
pub mod panel;
pub mod params;
pub mod reference;

pub use calendar::WeekdayHolidayCalendar;
pub use panel::{InMemoryPricePanel, PanelContract, PanelSnapshot};
pub use params::ConfigRollParameterSource;
pub use reference::InMemoryReferenceData;
