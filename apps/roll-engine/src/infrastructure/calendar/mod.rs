//! Holiday Calendar Adapters

mod weekday;

pub use weekday::WeekdayHolidayCalendar;
