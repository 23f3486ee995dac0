//! Business-day calendar abstraction.
//!
//! The core treats market holiday lookup as a black box: adapters only
//! need to answer [`HolidayCalendar::is_business_day`]. Day arithmetic is
//! provided on top of it.

use chrono::NaiveDate;

/// Upper bound on consecutive non-business days scanned before giving up.
///
/// Guards against calendars that never report a business day.
pub const MAX_NON_BUSINESS_RUN: u32 = 366;

/// Market holiday calendar.
pub trait HolidayCalendar: Send + Sync {
    /// Whether the market is open on `date`.
    fn is_business_day(&self, date: NaiveDate) -> bool;

    /// Text identifying which days are open. Calendars with different
    /// holidays must return different identities.
    fn identity(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Move `n` business days from `date`; negative `n` moves backward.
    ///
    /// `n = 0` returns `date` unchanged, even if it is not a business day.
    fn add_business_days(&self, date: NaiveDate, n: i32) -> NaiveDate {
        let mut current = date;
        let mut remaining = n.unsigned_abs();
        let mut idle = 0;

        while remaining > 0 && idle < MAX_NON_BUSINESS_RUN {
            let next = if n > 0 {
                current.succ_opt()
            } else {
                current.pred_opt()
            };
            let Some(next) = next else {
                break;
            };
            current = next;
            if self.is_business_day(current) {
                remaining -= 1;
                idle = 0;
            } else {
                idle += 1;
            }
        }

        current
    }

    /// `date` itself if it is a business day, else the closest earlier one.
    fn previous_business_day(&self, date: NaiveDate) -> NaiveDate {
        if self.is_business_day(date) {
            date
        } else {
            self.add_business_days(date, -1)
        }
    }

    /// Number of business days in `[start, end]`; zero if `end < start`.
    fn business_days_between(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .filter(|date| self.is_business_day(*date))
            .count() as u32
    }
}
