//! Duration grammar ("5 minutes") and human-readable threshold formatting.

use crate::error::EngineError;

/// Parse `<int>[ws]<unit>` (or a bare `<int>` meaning seconds) into seconds.
///
/// Units: s/sec/second(s), m/min/minute(s), h/hr/hour(s), d/day(s), w/week(s).
pub fn parse_seconds(text: &str) -> Result<u64, EngineError> {
  let s = text.trim();
  let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
  let (digits, unit) = s.split_at(split);
  if digits.is_empty() {
    return Err(EngineError::invalid("duration", &format!("expected a number in {:?}", text)));
  }
  let n: u64 = digits
    .parse()
    .map_err(|_| EngineError::invalid("duration", &format!("number out of range in {:?}", text)))?;

  let multiplier = unit_seconds(&unit.trim().to_ascii_lowercase())
    .ok_or_else(|| EngineError::invalid("duration", &format!("unknown unit in {:?}", text)))?;

  n.checked_mul(multiplier)
    .ok_or_else(|| EngineError::invalid("duration", &format!("{:?} is too long", text)))
}

fn unit_seconds(unit: &str) -> Option<u64> {
  let secs = match unit {
    "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
    "m" | "min" | "mins" | "minute" | "minutes" => 60,
    "h" | "hr" | "hrs" | "hour" | "hours" => 60 * 60,
    "d" | "day" | "days" => 24 * 60 * 60,
    "w" | "week" | "weeks" => 7 * 24 * 60 * 60,
    _ => return None,
  };
  Some(secs)
}

/// "55 seconds", "1 minute and 10 seconds", "2 minutes and 0 seconds".
pub fn format_threshold(seconds: i64) -> String {
  if seconds < 60 {
    format!("{} seconds", seconds)
  } else if seconds < 120 {
    format!("{} minute and {} seconds", seconds / 60, seconds % 60)
  } else {
    format!("{} minutes and {} seconds", seconds / 60, seconds % 60)
  }
}

/// Seconds to whole minutes, rounded up. Unknown is 0.
pub fn ceil_minutes(seconds: Option<f64>) -> i64 {
  match seconds {
    Some(s) if s.is_finite() => (s / 60.0).ceil() as i64,
    _ => 0,
  }
}
