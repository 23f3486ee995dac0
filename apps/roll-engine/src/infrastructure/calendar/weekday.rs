//! Monday to Friday calendar minus explicit market holidays.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use sha2::{Digest, Sha256};

use crate::domain::calendar::HolidayCalendar;

/// Business days are weekdays that are not listed holidays.
#[derive(Debug, Clone, Default)]
pub struct WeekdayHolidayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl WeekdayHolidayCalendar {
    /// Create a calendar with the given holidays.
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Whether `date` is a listed holiday.
    #[must_use]
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Number of listed holidays.
    #[must_use]
    pub fn holiday_count(&self) -> usize {
        self.holidays.len()
    }
}

impl HolidayCalendar for WeekdayHolidayCalendar {
    fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.is_holiday(date)
    }

    fn identity(&self) -> String {
        let mut hasher = Sha256::new();
        for holiday in &self.holidays {
            hasher.update(holiday.to_string().as_bytes());
            hasher.update(b"\n");
        }
        format!("weekday:{:x}", hasher.finalize())
    }
}
