//! Error taxonomy for the roll engine.
//!
//! Every failure raised by the core is a [`RollError`]. Errors are grouped
//! into an [`ErrorCategory`] which decides how a batch run treats them:
//!
//! | Category | Errors | Effect |
//! |----------|--------|--------|
//! | `Configuration` | `InvalidRollParameters`, `UnknownInstrument`, `NoSuchCycleMember`, `InvalidMonthCode`, `InvalidRollCycle` | Fatal for the instrument |
//! | `Data` | `NoPriceData`, `InfeasibleRoll` | Skipped by the builder and recorded as warnings |
//! | `Data` | `NoContracts`, `InvalidContractSymbol`, `PriceSource` | Fatal for the instrument |
//! | `Consistency` | `RollCalendarConsistency`, `DuplicateContract` | Fatal, no partial calendar |
//! | `Cancelled` | `Cancelled` | Build aborted, results discarded |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::contract::ContractId;

/// Broad class of a [`RollError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Bad or missing configuration.
    Configuration,
    /// Incomplete or malformed market data.
    Data,
    /// Invariant violation in produced artifacts.
    Consistency,
    /// Build aborted by the caller.
    Cancelled,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Data => write!(f, "DATA"),
            Self::Consistency => write!(f, "CONSISTENCY"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Errors raised while building roll calendars and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollError {
    /// A character is not one of the twelve futures month codes.
    #[error("Invalid month code '{code}'")]
    InvalidMonthCode {
        /// Offending character.
        code: char,
    },

    /// A roll cycle string could not be parsed.
    #[error("Invalid roll cycle '{cycle}': {message}")]
    InvalidRollCycle {
        /// Raw cycle string.
        cycle: String,
        /// Reason.
        message: String,
    },

    /// A contract ticker could not be parsed.
    #[error("Invalid contract symbol '{symbol}': {message}")]
    InvalidContractSymbol {
        /// Raw symbol.
        symbol: String,
        /// Reason.
        message: String,
    },

    /// Roll parameters broke a business rule.
    #[error("Invalid roll parameters for {instrument}: {rule}")]
    InvalidRollParameters {
        /// Instrument code.
        instrument: String,
        /// Human-readable rule violation.
        rule: String,
    },

    /// No roll parameters are known for the instrument.
    #[error("Unknown instrument: {instrument}")]
    UnknownInstrument {
        /// Instrument code.
        instrument: String,
    },

    /// A contract's month code does not appear in the cycle being walked.
    #[error("Contract {contract} is not a member of roll cycle {cycle}")]
    NoSuchCycleMember {
        /// Contract identity.
        contract: ContractId,
        /// Cycle as a string of month codes.
        cycle: String,
    },

    /// A contract has no price observations.
    #[error("No price data for contract {contract}")]
    NoPriceData {
        /// Contract identity.
        contract: ContractId,
    },

    /// A transition cannot be priced on its roll date.
    #[error("Infeasible roll {from} -> {to} on {date}: {reason}")]
    InfeasibleRoll {
        /// Outgoing contract.
        from: ContractId,
        /// Incoming contract.
        to: ContractId,
        /// Computed roll date.
        date: NaiveDate,
        /// Reason the roll was rejected.
        reason: String,
    },

    /// The instrument has no usable contracts.
    #[error("No usable contracts for instrument {instrument}")]
    NoContracts {
        /// Instrument code.
        instrument: String,
    },

    /// A price source failed.
    #[error("Price source failed for {instrument}: {message}")]
    PriceSource {
        /// Instrument code.
        instrument: String,
        /// Source error message.
        message: String,
    },

    /// The same contract was registered twice with different expiries.
    #[error("Duplicate contract {contract}: expiry {existing} conflicts with {conflicting}")]
    DuplicateContract {
        /// Contract identity.
        contract: ContractId,
        /// Expiry already registered.
        existing: NaiveDate,
        /// Expiry of the rejected registration.
        conflicting: NaiveDate,
    },

    /// A built calendar violated an ordering invariant.
    #[error("Roll calendar for {instrument} is inconsistent: {message}")]
    RollCalendarConsistency {
        /// Instrument code.
        instrument: String,
        /// Invariant that failed.
        message: String,
    },

    /// The build was cancelled between contract iterations.
    #[error("Build cancelled for {instrument}")]
    Cancelled {
        /// Instrument code.
        instrument: String,
    },
}

impl RollError {
    /// Category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidMonthCode { .. }
            | Self::InvalidRollCycle { .. }
            | Self::InvalidRollParameters { .. }
            | Self::UnknownInstrument { .. }
            | Self::NoSuchCycleMember { .. } => ErrorCategory::Configuration,

            Self::InvalidContractSymbol { .. }
            | Self::NoPriceData { .. }
            | Self::InfeasibleRoll { .. }
            | Self::NoContracts { .. }
            | Self::PriceSource { .. } => ErrorCategory::Data,

            Self::DuplicateContract { .. } | Self::RollCalendarConsistency { .. } => {
                ErrorCategory::Consistency
            }

            Self::Cancelled { .. } => ErrorCategory::Cancelled,
        }
    }

    /// Whether the builder may skip past this error instead of aborting.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoPriceData { .. } | Self::InfeasibleRoll { .. })
    }

    /// Stable reason code for reports.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidMonthCode { .. } => "INVALID_MONTH_CODE",
            Self::InvalidRollCycle { .. } => "INVALID_ROLL_CYCLE",
            Self::InvalidContractSymbol { .. } => "INVALID_CONTRACT_SYMBOL",
            Self::InvalidRollParameters { .. } => "INVALID_ROLL_PARAMETERS",
            Self::UnknownInstrument { .. } => "UNKNOWN_INSTRUMENT",
            Self::NoSuchCycleMember { .. } => "NO_SUCH_CYCLE_MEMBER",
            Self::NoPriceData { .. } => "NO_PRICE_DATA",
            Self::InfeasibleRoll { .. } => "INFEASIBLE_ROLL",
            Self::NoContracts { .. } => "NO_CONTRACTS",
            Self::PriceSource { .. } => "PRICE_SOURCE",
            Self::DuplicateContract { .. } => "DUPLICATE_CONTRACT",
            Self::RollCalendarConsistency { .. } => "ROLL_CALENDAR_CONSISTENCY",
            Self::Cancelled { .. } => "CANCELLED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::MonthCode;

    fn es_h25() -> ContractId {
        ContractId::new("ES", 2025, MonthCode::H)
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            RollError::UnknownInstrument {
                instrument: "ES".to_string()
            }
            .category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            RollError::NoPriceData { contract: es_h25() }.category(),
            ErrorCategory::Data
        );
        assert_eq!(
            RollError::RollCalendarConsistency {
                instrument: "ES".to_string(),
                message: "x".to_string()
            }
            .category(),
            ErrorCategory::Consistency
        );
    }

    #[test]
    fn test_only_data_gaps_are_recoverable() {
        assert!(RollError::NoPriceData { contract: es_h25() }.is_recoverable());
        assert!(
            !RollError::NoContracts {
                instrument: "ES".to_string()
            }
            .is_recoverable()
        );
        assert!(
            !RollError::DuplicateContract {
                contract: es_h25(),
                existing: NaiveDate::from_ymd_opt(2025, 3, 21).unwrap(),
                conflicting: NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(),
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_display_names_contract() {
        let err = RollError::NoPriceData { contract: es_h25() };
        assert_eq!(err.to_string(), "No price data for contract ES/202503");
        assert_eq!(err.reason(), "NO_PRICE_DATA");
    }
}
