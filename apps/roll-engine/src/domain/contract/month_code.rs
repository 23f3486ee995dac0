//! Futures month codes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RollError;

/// One of the twelve exchange month letters (F = January ... Z = December).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub enum MonthCode {
    /// January.
    F,
    /// February.
    G,
    /// March.
    H,
    /// April.
    J,
    /// May.
    K,
    /// June.
    M,
    /// July.
    N,
    /// August.
    Q,
    /// September.
    U,
    /// October.
    V,
    /// November.
    X,
    /// December.
    Z,
}

impl MonthCode {
    /// All codes in calendar order.
    pub const ALL: [Self; 12] = [
        Self::F,
        Self::G,
        Self::H,
        Self::J,
        Self::K,
        Self::M,
        Self::N,
        Self::Q,
        Self::U,
        Self::V,
        Self::X,
        Self::Z,
    ];

    /// Calendar month number (1-12).
    #[must_use]
    pub const fn month(self) -> u32 {
        match self {
            Self::F => 1,
            Self::G => 2,
            Self::H => 3,
            Self::J => 4,
            Self::K => 5,
            Self::M => 6,
            Self::N => 7,
            Self::Q => 8,
            Self::U => 9,
            Self::V => 10,
            Self::X => 11,
            Self::Z => 12,
        }
    }

    /// Code for a calendar month number.
    #[must_use]
    pub fn from_month(month: u32) -> Option<Self> {
        Self::ALL.get((month as usize).checked_sub(1)?).copied()
    }

    /// The letter for this code.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::F => 'F',
            Self::G => 'G',
            Self::H => 'H',
            Self::J => 'J',
            Self::K => 'K',
            Self::M => 'M',
            Self::N => 'N',
            Self::Q => 'Q',
            Self::U => 'U',
            Self::V => 'V',
            Self::X => 'X',
            Self::Z => 'Z',
        }
    }

    /// Parse a month letter (case-insensitive).
    pub fn from_char(code: char) -> Result<Self, RollError> {
        match code.to_ascii_uppercase() {
            'F' => Ok(Self::F),
            'G' => Ok(Self::G),
            'H' => Ok(Self::H),
            'J' => Ok(Self::J),
            'K' => Ok(Self::K),
            'M' => Ok(Self::M),
            'N' => Ok(Self::N),
            'Q' => Ok(Self::Q),
            'U' => Ok(Self::U),
            'V' => Ok(Self::V),
            'X' => Ok(Self::X),
            'Z' => Ok(Self::Z),
            _ => Err(RollError::InvalidMonthCode { code }),
        }
    }
}

impl TryFrom<char> for MonthCode {
    type Error = RollError;

    fn try_from(code: char) -> Result<Self, Self::Error> {
        Self::from_char(code)
    }
}

impl From<MonthCode> for char {
    fn from(code: MonthCode) -> Self {
        code.as_char()
    }
}

impl fmt::Display for MonthCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
