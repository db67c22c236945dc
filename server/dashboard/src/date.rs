//! Date parsing and query windows.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::error::DashboardError;

/// Default lookback when no start is given.
const DEFAULT_LOOKBACK_HOURS: i64 = 24;
/// Longest lookback honoured (100 years).
const MAX_LOOKBACK_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Parse a `YYYY-MM-DD` route segment.
pub fn parse_day(s: &str) -> Result<NaiveDate, DashboardError> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| DashboardError::invalid("date", &format!("expected YYYY-MM-DD, got {:?}: {}", s, e)))
}

/// Half-open query window; the store filters `start < time < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

impl TimeWindow {
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
    Self { start, end }
  }

  /// End defaults to (and is capped at) `now`; start defaults to 24h before end.
  pub fn resolve(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
    let end = end.filter(|e| *e <= now).unwrap_or(now);
    let start = start.unwrap_or(end - Duration::hours(DEFAULT_LOOKBACK_HOURS));
    Self { start, end }
  }

  /// From the start of `first` to the end of `last` (UTC days).
  pub fn days(first: NaiveDate, last: NaiveDate, now: DateTime<Utc>) -> Result<Self, DashboardError> {
    let after_last = last
      .succ_opt()
      .ok_or_else(|| DashboardError::invalid("date", "out of range"))?;
    let start = first.and_time(NaiveTime::default()).and_utc();
    let end = after_last.and_time(NaiveTime::default()).and_utc();
    Ok(Self::resolve(Some(start), Some(end), now))
  }

  /// The last `secs` seconds before `now`.
  pub fn lookback(secs: u64, now: DateTime<Utc>) -> Self {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX).min(MAX_LOOKBACK_SECS);
    let start = now
      .checked_sub_signed(Duration::seconds(secs))
      .unwrap_or(DateTime::<Utc>::MIN_UTC);
    Self { start, end: now }
  }

  /// Window strictly containing every epoch second in `oldest..=newest`.
  pub fn around(oldest: i64, newest: i64) -> Self {
    let at = |secs: i64| DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MIN_UTC);
    Self {
      start: at(oldest - 1),
      end: at(newest + 1),
    }
  }

  pub fn start_secs(&self) -> i64 {
    self.start.timestamp()
  }

  pub fn end_secs(&self) -> i64 {
    self.end.timestamp()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
  }

  #[test]
  fn parse_day_accepts_iso_dates() {
    assert_eq!(parse_day("2025-01-15").unwrap(), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    assert!(parse_day("15/01/2025").is_err());
    assert!(parse_day("").is_err());
  }

  #[test]
  fn resolve_defaults_to_last_day() {
    let w = TimeWindow::resolve(None, None, now());
    assert_eq!(w.end, now());
    assert_eq!(w.end - w.start, Duration::hours(24));
  }

  #[test]
  fn end_capped_at_now() {
    let future = now() + Duration::days(3);
    let w = TimeWindow::resolve(None, Some(future), now());
    assert_eq!(w.end, now());
  }

  #[test]
  fn days_cover_whole_utc_days() {
    let d = |day| NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
    let w = TimeWindow::days(d(10), d(11), now()).unwrap();
    assert_eq!(w.start, Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap());
    assert_eq!(w.end, Utc.with_ymd_and_hms(2025, 1, 12, 0, 0, 0).unwrap());

    let today = TimeWindow::days(d(15), d(15), now()).unwrap();
    assert_eq!(today.end, now());
  }

  #[test]
  fn days_ending_on_the_last_date_are_rejected() {
    let last = parse_day("+262142-12-31").unwrap();
    let first = parse_day("2025-01-01").unwrap();
    let err = TimeWindow::days(first, last, now()).unwrap_err();
    assert!(err.to_string().contains("out of range"));
  }

  #[test]
  fn lookback_and_around() {
    let w = TimeWindow::lookback(3600, now());
    assert_eq!(w.end_secs() - w.start_secs(), 3600);

    let w = TimeWindow::around(100, 200);
    assert_eq!((w.start_secs(), w.end_secs()), (99, 201));
  }
}
