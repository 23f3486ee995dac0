//! Roll date for a single contract transition.

use chrono::NaiveDate;

use crate::domain::calendar::HolidayCalendar;
use crate::domain::contract::{Contract, PriceAvailability, PriceRange};
use crate::error::RollError;

use super::{ExpiryRollRule, RollParameters};

/// A computed roll date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollDate {
    /// Date on which the transition takes effect.
    pub date: NaiveDate,
    /// True if a `FirstNotice` rule fell back to the expiry date.
    pub missing_first_notice: bool,
}

/// Computes holiday-adjusted roll dates and checks they can be priced.
pub struct RollDateCalculator<'a> {
    calendar: &'a dyn HolidayCalendar,
    prices: &'a dyn PriceAvailability,
    params: &'a RollParameters,
}

impl<'a> RollDateCalculator<'a> {
    /// Create a calculator for one instrument's parameters.
    #[must_use]
    pub fn new(
        calendar: &'a dyn HolidayCalendar,
        prices: &'a dyn PriceAvailability,
        params: &'a RollParameters,
    ) -> Self {
        Self {
            calendar,
            prices,
            params,
        }
    }

    /// Date the roll offset is applied to, and whether the rule had to
    /// fall back to expiry.
    #[must_use]
    pub fn reference_date(&self, contract: &Contract) -> (NaiveDate, bool) {
        match self.params.expiry_roll_rule() {
            ExpiryRollRule::FixedOffsetFromExpiry => (contract.expiry(), false),
            ExpiryRollRule::FirstNotice => contract
                .first_notice()
                .map_or((contract.expiry(), true), |date| (date, false)),
        }
    }

    /// Roll date out of `contract` before any price anchoring.
    #[must_use]
    pub fn scheduled(&self, contract: &Contract) -> RollDate {
        let (reference, missing_first_notice) = self.reference_date(contract);
        let anchor = self.calendar.previous_business_day(reference);
        RollDate {
            date: self
                .calendar
                .add_business_days(anchor, self.params.roll_offset_days()),
            missing_first_notice,
        }
    }

    /// Whether `contract` still has prices on its own scheduled roll date.
    #[must_use]
    pub fn can_roll_out(&self, contract: &Contract) -> bool {
        let scheduled = self.scheduled(contract).date;
        contract
            .price_range()
            .is_some_and(|range| range.contains(scheduled))
    }

    /// Roll date for the transition `from -> to`.
    ///
    /// The scheduled date is moved forward to the first business day on
    /// which both contracts have a price, never past either contract's last
    /// price date.
    ///
    /// # Errors
    ///
    /// - [`RollError::NoPriceData`] if either contract never traded
    /// - [`RollError::InfeasibleRoll`] if the date falls outside the price
    ///   ranges or no common price date exists
    pub fn roll_date(&self, from: &Contract, to: &Contract) -> Result<RollDate, RollError> {
        let from_range = price_range(from)?;
        let to_range = price_range(to)?;
        let scheduled = self.scheduled(from);

        let infeasible = |date: NaiveDate, reason: &str| RollError::InfeasibleRoll {
            from: from.id().clone(),
            to: to.id().clone(),
            date,
            reason: reason.to_string(),
        };

        if scheduled.date > from_range.last {
            return Err(infeasible(
                scheduled.date,
                &format!("after last price of {} on {}", from.id(), from_range.last),
            ));
        }
        if scheduled.date < to_range.first {
            return Err(infeasible(
                scheduled.date,
                &format!("before first price of {} on {}", to.id(), to_range.first),
            ));
        }
        if scheduled.date > to_range.last {
            return Err(infeasible(
                scheduled.date,
                &format!("after last price of {} on {}", to.id(), to_range.last),
            ));
        }

        let limit = from_range.last.min(to_range.last);
        let mut date = scheduled.date;
        while date <= limit {
            if self.prices.has_price(from.id(), date) && self.prices.has_price(to.id(), date) {
                return Ok(RollDate { date, ..scheduled });
            }
            let next = self.calendar.add_business_days(date, 1);
            if next <= date {
                break;
            }
            date = next;
        }

        Err(infeasible(scheduled.date, "no common price date"))
    }
}

fn price_range(contract: &Contract) -> Result<PriceRange, RollError> {
    contract.price_range().ok_or_else(|| RollError::NoPriceData {
        contract: contract.id().clone(),
    })
}
