//! Roll parameters and their validation.
//!
//! [`RollParameterConfig`] is the raw, serde-loadable form as it appears in
//! configuration files. [`RollParameters`] is the validated form consumed by
//! the builder; [`RollParameters::from_config`] is the only place roll
//! business rules are enforced.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::RollCycle;
use crate::error::RollError;

/// Approximate number of business days in one calendar month.
const BUSINESS_DAYS_PER_MONTH: u32 = 19;

/// Largest valid day-of-month for `expiry_offset`.
const MAX_EXPIRY_DAY: u32 = 31;

/// Which date a roll is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryRollRule {
    /// Roll relative to the contract's expiry date.
    #[default]
    FixedOffsetFromExpiry,
    /// Roll relative to the first notice date, falling back to expiry.
    FirstNotice,
}

/// Raw roll parameters for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollParameterConfig {
    /// Months held in the position series, e.g. `HMUZ`.
    pub hold_rollcycle: String,
    /// Months used for the priced series, e.g. `HMUZ`.
    pub priced_rollcycle: String,
    /// Signed business-day offset applied to the reference date.
    #[serde(default)]
    pub roll_offset_days: i32,
    /// Signed priced-cycle steps from the priced contract to the carry.
    #[serde(default = "default_carry_offset")]
    pub carry_offset: i32,
    /// Day of month used to approximate a missing expiry (0 means the 15th).
    #[serde(default)]
    pub expiry_offset: u32,
    /// Reference date rule.
    #[serde(default)]
    pub roll_rule: ExpiryRollRule,
}

const fn default_carry_offset() -> i32 {
    -1
}

impl RollParameterConfig {
    /// Raw config with the same cycle for priced and held series.
    #[must_use]
    pub fn new(cycle: &str, roll_offset_days: i32, carry_offset: i32) -> Self {
        Self {
            hold_rollcycle: cycle.to_string(),
            priced_rollcycle: cycle.to_string(),
            roll_offset_days,
            carry_offset,
            expiry_offset: 0,
            roll_rule: ExpiryRollRule::default(),
        }
    }
}

/// Validated roll parameters for one instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollParameters {
    instrument: String,
    priced_cycle: RollCycle,
    held_cycle: RollCycle,
    roll_offset_days: i32,
    carry_offset: i32,
    expiry_offset: u32,
    expiry_roll_rule: ExpiryRollRule,
}

impl RollParameters {
    /// Validate raw parameters.
    ///
    /// # Errors
    ///
    /// [`RollError::InvalidRollParameters`] naming the violated rule.
    pub fn from_config(instrument: &str, config: &RollParameterConfig) -> Result<Self, RollError> {
        let instrument = instrument.to_uppercase();
        let invalid = |rule: String| RollError::InvalidRollParameters {
            instrument: instrument.clone(),
            rule,
        };

        let priced_cycle: RollCycle = config
            .priced_rollcycle
            .parse()
            .map_err(|e: RollError| invalid(format!("priced cycle: {e}")))?;
        let held_cycle: RollCycle = config
            .hold_rollcycle
            .parse()
            .map_err(|e: RollError| invalid(format!("held cycle: {e}")))?;

        if !held_cycle.is_superset_of(&priced_cycle) {
            let missing: String = held_cycle
                .missing_from(&priced_cycle)
                .iter()
                .map(|code| code.as_char())
                .collect();
            return Err(invalid(format!(
                "held cycle {held_cycle} must contain every priced month; missing {missing}"
            )));
        }

        if config.roll_offset_days > 0 {
            return Err(invalid(format!(
                "roll_offset_days must be <= 0, got {}",
                config.roll_offset_days
            )));
        }

        let max_offset = priced_cycle.min_gap_months() * BUSINESS_DAYS_PER_MONTH;
        if config.roll_offset_days.unsigned_abs() >= max_offset {
            return Err(invalid(format!(
                "roll_offset_days {} reaches past the previous roll (limit {max_offset} business days)",
                config.roll_offset_days
            )));
        }

        let cycle_len = i32::try_from(priced_cycle.len()).unwrap_or(i32::MAX);
        if config.carry_offset == 0 {
            return Err(invalid("carry_offset must be non-zero".to_string()));
        }
        if config.carry_offset.abs() > cycle_len {
            return Err(invalid(format!(
                "carry_offset {} exceeds priced cycle length {cycle_len}",
                config.carry_offset
            )));
        }

        if config.expiry_offset > MAX_EXPIRY_DAY {
            return Err(invalid(format!(
                "expiry_offset {} is not a day of month",
                config.expiry_offset
            )));
        }

        Ok(Self {
            instrument,
            priced_cycle,
            held_cycle,
            roll_offset_days: config.roll_offset_days,
            carry_offset: config.carry_offset,
            expiry_offset: config.expiry_offset,
            expiry_roll_rule: config.roll_rule,
        })
    }

    /// Instrument code.
    #[must_use]
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Priced cycle.
    #[must_use]
    pub const fn priced_cycle(&self) -> &RollCycle {
        &self.priced_cycle
    }

    /// Held cycle.
    #[must_use]
    pub const fn held_cycle(&self) -> &RollCycle {
        &self.held_cycle
    }

    /// Signed business-day offset from the reference date.
    #[must_use]
    pub const fn roll_offset_days(&self) -> i32 {
        self.roll_offset_days
    }

    /// Signed priced-cycle steps to the carry contract.
    #[must_use]
    pub const fn carry_offset(&self) -> i32 {
        self.carry_offset
    }

    /// Approximate expiry day of month.
    #[must_use]
    pub const fn expiry_offset(&self) -> u32 {
        self.expiry_offset
    }

    /// Reference date rule.
    #[must_use]
    pub const fn expiry_roll_rule(&self) -> ExpiryRollRule {
        self.expiry_roll_rule
    }

    /// Canonical text of every validated field. Equal parameters give equal
    /// text.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{:?}",
            self.instrument,
            self.priced_cycle,
            self.held_cycle,
            self.roll_offset_days,
            self.carry_offset,
            self.expiry_offset,
            self.expiry_roll_rule
        )
    }
}

/// Validated roll parameters keyed by instrument.
#[derive(Debug, Clone, Default)]
pub struct RollParameterStore {
    params: HashMap<String, RollParameters>,
}

impl RollParameterStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store parameters for an instrument, replacing any
    /// previous entry.
    ///
    /// # Errors
    ///
    /// [`RollError::InvalidRollParameters`] if validation fails; the store
    /// is left unchanged.
    pub fn load(
        &mut self,
        instrument: &str,
        config: &RollParameterConfig,
    ) -> Result<&RollParameters, RollError> {
        let params = RollParameters::from_config(instrument, config)?;
        let key = params.instrument().to_string();
        self.params.insert(key.clone(), params);
        self.get(&key)
    }

    /// Parameters for an instrument.
    ///
    /// # Errors
    ///
    /// [`RollError::UnknownInstrument`] if nothing was loaded.
    pub fn get(&self, instrument: &str) -> Result<&RollParameters, RollError> {
        self.params
            .get(&instrument.to_uppercase())
            .ok_or_else(|| RollError::UnknownInstrument {
                instrument: instrument.to_string(),
            })
    }

    /// Number of instruments loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
