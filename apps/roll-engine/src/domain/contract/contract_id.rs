//! Contract identity value object.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::MonthCode;
use crate::error::RollError;

/// Exchange suffixes stripped from security names before parsing.
const SECURITY_SUFFIXES: [&str; 4] = [" Index", " Comdty", " Curncy", " Equity"];

/// Identity of a single dated contract: instrument + year + month code.
///
/// Ordered by instrument, then year, then month. The canonical string form
/// is `ES/202503`, which is also the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractId {
    instrument: String,
    year: i32,
    month: MonthCode,
}

impl ContractId {
    /// Create a contract identity. The instrument code is upper-cased.
    #[must_use]
    pub fn new(instrument: impl Into<String>, year: i32, month: MonthCode) -> Self {
        Self {
            instrument: instrument.into().trim().to_uppercase(),
            year,
            month,
        }
    }

    /// Instrument code.
    #[must_use]
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Contract year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Contract month code.
    #[must_use]
    pub const fn month(&self) -> MonthCode {
        self.month
    }

    /// Same instrument, different year and month.
    #[must_use]
    pub fn with_year_month(&self, year: i32, month: MonthCode) -> Self {
        Self {
            instrument: self.instrument.clone(),
            year,
            month,
        }
    }

    /// Canonical key, e.g. `ES/202503`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{:04}{:02}", self.instrument, self.year, self.month.month())
    }

    /// Exchange-style ticker with a two digit year, e.g. `ESH25`.
    #[must_use]
    pub fn symbol(&self) -> String {
        format!(
            "{}{}{:02}",
            self.instrument,
            self.month,
            self.year.rem_euclid(100)
        )
    }

    /// Parse an exchange ticker or security name.
    ///
    /// Accepts `ESH25`, `ESH2025`, `ESH5 Index`, `CLZ5 Comdty`. Single digit
    /// years resolve to the year nearest `pivot_year` ending in that digit.
    pub fn parse_symbol(security: &str, pivot_year: i32) -> Result<Self, RollError> {
        let invalid = |message: &str| RollError::InvalidContractSymbol {
            symbol: security.to_string(),
            message: message.to_string(),
        };

        let mut base = security.trim();
        for suffix in SECURITY_SUFFIXES {
            if let Some(stripped) = base.strip_suffix(suffix) {
                base = stripped.trim_end();
            }
        }

        let digits_at = base
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| invalid("missing year digits"))?;
        let (letters, digits) = base.split_at(digits_at);

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("trailing characters after year"));
        }

        let mut chars = letters.chars();
        let code = chars.next_back().ok_or_else(|| invalid("missing month code"))?;
        let instrument = chars.as_str();
        if instrument.is_empty() || !instrument.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("missing instrument code"));
        }
        let month = MonthCode::from_char(code).map_err(|_| invalid("bad month code"))?;

        let value: i32 = digits.parse().map_err(|_| invalid("bad year"))?;
        let year = match digits.len() {
            1 => nearest_year_ending_in(value, pivot_year),
            2 => 2000 + value,
            4 => value,
            _ => return Err(invalid("year must have 1, 2 or 4 digits")),
        };

        Ok(Self::new(instrument, year, month))
    }
}

fn nearest_year_ending_in(digit: i32, pivot_year: i32) -> i32 {
    let decade = pivot_year - pivot_year.rem_euclid(10);
    [decade - 10 + digit, decade + digit, decade + 10 + digit]
        .into_iter()
        .min_by_key(|candidate| (candidate - pivot_year).abs())
        .unwrap_or(decade + digit)
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for ContractId {
    type Err = RollError;

    /// Parse the canonical `ES/202503` key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| RollError::InvalidContractSymbol {
            symbol: s.to_string(),
            message: message.to_string(),
        };

        let (instrument, date) = s.split_once('/').ok_or_else(|| invalid("expected ROOT/YYYYMM"))?;
        if instrument.is_empty() || date.len() != 6 || !date.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected ROOT/YYYYMM"));
        }
        let year: i32 = date[..4].parse().map_err(|_| invalid("bad year"))?;
        let month: u32 = date[4..].parse().map_err(|_| invalid("bad month"))?;
        let month = MonthCode::from_month(month).ok_or_else(|| invalid("month out of range"))?;

        Ok(Self::new(instrument, year, month))
    }
}

impl TryFrom<String> for ContractId {
    type Error = RollError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContractId> for String {
    fn from(id: ContractId) -> Self {
        id.key()
    }
}
