//! Application services.

mod calendar_cache;

pub use calendar_cache::{CacheKey, CalendarCache};
