//! On-call shift windows (UTC).
//!
//! Weeknights run 17:00 to 09:30 the next morning; the weekend shift runs from Saturday
//! 09:30 to Monday 09:30.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

fn at(date: NaiveDate, hour: u32, min: u32) -> NaiveDateTime {
  date.and_time(NaiveTime::from_hms_opt(hour, min, 0).unwrap_or_default())
}

/// The on-call shift covering the evening of `at_time`'s day (or its weekend).
///
/// `None` when the shift would end past the last representable date.
pub fn oncall_window(at_time: NaiveDateTime) -> Option<(NaiveDateTime, NaiveDateTime)> {
  let day = at_time.date();
  let shift = |days: i64| day.checked_add_signed(Duration::days(days));
  Some(match day.weekday() {
    Weekday::Sat => (at(day, 9, 30), at(shift(2)?, 9, 30)),
    Weekday::Sun => (at(shift(-1)?, 9, 30), at(shift(1)?, 9, 30)),
    _ => (at(day, 17, 0), at(shift(1)?, 9, 30)),
  })
}
