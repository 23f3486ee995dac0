//! Contract Bounded Context
//!
//! Contract identities, dated contracts, their price observations and the
//! per-instrument contract universe.

mod contract_id;
mod futures_contract;
mod month_code;
mod price_history;
mod universe;

pub use contract_id::ContractId;
pub use futures_contract::{Contract, DEFAULT_APPROX_EXPIRY_DAY, PriceObservation, PriceRange};
pub use month_code::MonthCode;
pub use price_history::{PriceAvailability, PriceHistory};
pub use universe::ContractUniverse;
