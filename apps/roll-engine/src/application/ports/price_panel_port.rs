//! Price Panel Port (Driven Port)
//!
//! Interface for reading per-contract price histories.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::contract::{ContractId, PriceAvailability, PriceObservation};

/// Errors raised by data sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The source has nothing for the instrument.
    #[error("Instrument not found: {instrument}")]
    NotFound {
        /// Instrument code.
        instrument: String,
    },

    /// The source could not be read.
    #[error("Data source unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// The source returned malformed data.
    #[error("Malformed source data: {message}")]
    Malformed {
        /// Error details.
        message: String,
    },
}

/// A contract as listed by the price panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractListing {
    /// Contract identity.
    pub id: ContractId,
    /// Expiry date, when the source knows it.
    #[serde(default)]
    pub expiry: Option<NaiveDate>,
    /// First notice date, when the source knows it.
    #[serde(default)]
    pub first_notice: Option<NaiveDate>,
}

/// Port for reading the price panel.
pub trait PricePanelSource: Send + Sync {
    /// Instruments present in the panel.
    fn instruments(&self) -> Vec<String>;

    /// Contracts listed for an instrument.
    fn list_contracts(&self, instrument: &str) -> Result<Vec<ContractListing>, SourceError>;

    /// First and last price dates of a contract.
    fn price_range(&self, contract: &ContractId) -> Option<(NaiveDate, NaiveDate)>;

    /// Whether a contract has a price on a date.
    fn has_price(&self, contract: &ContractId, date: NaiveDate) -> bool;

    /// All observations of a contract in date order.
    fn observations(&self, contract: &ContractId) -> Vec<PriceObservation>;

    /// Version of the data backing an instrument; changes whenever its
    /// prices change.
    fn snapshot_version(&self, instrument: &str) -> String;
}

/// Adapts a [`PricePanelSource`] to the domain's [`PriceAvailability`].
pub struct PanelPrices<'a, P: ?Sized>(pub &'a P);

impl<P: PricePanelSource + ?Sized> PriceAvailability for PanelPrices<'_, P> {
    fn has_price(&self, contract: &ContractId, date: NaiveDate) -> bool {
        self.0.has_price(contract, date)
    }
}
