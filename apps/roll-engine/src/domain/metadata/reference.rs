//! Static instrument reference attributes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exchange-level attributes of an instrument.
///
/// Every field is optional in the source data; missing text fields are
/// empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentReference {
    /// Listing exchange, e.g. `CME`.
    pub exchange: String,
    /// Asset class, e.g. `Equity Index`.
    pub asset_class: String,
    /// Quote currency.
    pub currency: String,
    /// Trading hours description.
    pub trading_hours: String,
    /// Vendor ticker root.
    pub ticker: String,
    /// Contract multiplier (point value).
    pub multiplier: Option<Decimal>,
    /// Minimum price increment.
    pub tick_size: Option<Decimal>,
    /// Value of one tick in `currency`.
    pub tick_value: Option<Decimal>,
}

impl InstrumentReference {
    /// Fill fields that are empty in `self` from `fallback`.
    #[must_use]
    pub fn or(self, fallback: &Self) -> Self {
        let text = |value: String, other: &String| {
            if value.is_empty() { other.clone() } else { value }
        };
        Self {
            exchange: text(self.exchange, &fallback.exchange),
            asset_class: text(self.asset_class, &fallback.asset_class),
            currency: text(self.currency, &fallback.currency),
            trading_hours: text(self.trading_hours, &fallback.trading_hours),
            ticker: text(self.ticker, &fallback.ticker),
            multiplier: self.multiplier.or(fallback.multiplier),
            tick_size: self.tick_size.or(fallback.tick_size),
            tick_value: self.tick_value.or(fallback.tick_value),
        }
    }

    /// Tick value, derived from tick size and multiplier when not given.
    #[must_use]
    pub fn effective_tick_value(&self) -> Option<Decimal> {
        self.tick_value
            .or_else(|| Some(self.tick_size? * self.multiplier?))
    }
}
