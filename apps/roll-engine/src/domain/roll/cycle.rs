//! Roll cycle value object.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::contract::MonthCode;
use crate::error::RollError;

/// Ordered, cyclic sequence of month codes, e.g. `HMUZ`.
///
/// Invariants: non-empty, no duplicates, codes in calendar order. The
/// sequence wraps from its last code back to its first in the next year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RollCycle {
    codes: Vec<MonthCode>,
}

impl RollCycle {
    /// Build a cycle from month codes.
    pub fn new(codes: Vec<MonthCode>) -> Result<Self, RollError> {
        let raw: String = codes.iter().map(|c| c.as_char()).collect();
        let invalid = |message: &str| RollError::InvalidRollCycle {
            cycle: raw.clone(),
            message: message.to_string(),
        };

        if codes.is_empty() {
            return Err(invalid("cycle is empty"));
        }
        for pair in codes.windows(2) {
            if pair[0] == pair[1] {
                return Err(invalid(&format!("duplicate month code {}", pair[0])));
            }
            if pair[0] > pair[1] {
                return Err(invalid("month codes must be in calendar order"));
            }
        }

        Ok(Self { codes })
    }

    /// Every month of the year.
    #[must_use]
    pub fn monthly() -> Self {
        Self {
            codes: MonthCode::ALL.to_vec(),
        }
    }

    /// Month codes in order.
    #[must_use]
    pub fn codes(&self) -> &[MonthCode] {
        &self.codes
    }

    /// Number of codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Always false; cycles are non-empty by construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Whether `code` is a member.
    #[must_use]
    pub fn contains(&self, code: MonthCode) -> bool {
        self.codes.contains(&code)
    }

    /// Index of `code` in the cycle.
    #[must_use]
    pub fn position(&self, code: MonthCode) -> Option<usize> {
        self.codes.iter().position(|c| *c == code)
    }

    /// Whether every code of `other` is also in `self`.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        other.codes.iter().all(|code| self.contains(*code))
    }

    /// Codes of `other` missing from `self`.
    #[must_use]
    pub fn missing_from(&self, other: &Self) -> Vec<MonthCode> {
        other
            .codes
            .iter()
            .copied()
            .filter(|code| !self.contains(*code))
            .collect()
    }

    /// Smallest distance in months between consecutive members, including
    /// the wrap from the last code to the first.
    #[must_use]
    pub fn min_gap_months(&self) -> u32 {
        let wrap = match (self.codes.first(), self.codes.last()) {
            (Some(first), Some(last)) => 12 - last.month() + first.month(),
            _ => 12,
        };
        self.codes
            .windows(2)
            .map(|pair| pair[1].month() - pair[0].month())
            .chain(std::iter::once(wrap))
            .min()
            .unwrap_or(12)
    }
}

impl fmt::Display for RollCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for code in &self.codes {
            write!(f, "{code}")?;
        }
        Ok(())
    }
}

impl FromStr for RollCycle {
    type Err = RollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let codes = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(MonthCode::from_char)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| RollError::InvalidRollCycle {
                cycle: s.to_string(),
                message: err.to_string(),
            })?;
        Self::new(codes)
    }
}

impl TryFrom<String> for RollCycle {
    type Error = RollError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RollCycle> for String {
    fn from(cycle: RollCycle) -> Self {
        cycle.to_string()
    }
}
