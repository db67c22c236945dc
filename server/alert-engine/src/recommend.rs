//! Alert threshold recommendations.
//!
//! Given per-signature percentile resolve times, suggest a delay threshold that would have
//! suppressed `percentage`% of the alerts, keeping only signatures that recover within
//! `recover_within` and occurred at least `more_than` times.

use crate::duration;
use crate::error::EngineError;
use crate::types::{IncidentAggregateRow, SortBy, ThresholdRecommendation};

/// Seconds added on top of the percentile resolve time.
pub const THRESHOLD_MARGIN_SECS: i64 = 5;

/// A row that survived filtering, borrowed from the input.
struct Retained<'a> {
  incident_key: &'a str,
  count: u64,
  percentile: i64,
}

/// Filter, compute, format and rank threshold recommendations.
///
/// Fails with `InvalidArgument` when `percentage` is outside `1..=100` or `recover_within`
/// does not parse to a positive number of seconds. Rows without an incident key or without
/// a percentile are dropped silently.
pub fn recommend(
  rows: &[IncidentAggregateRow],
  percentage: u32,
  more_than: u64,
  recover_within: &str,
  sort_by: SortBy,
) -> Result<Vec<ThresholdRecommendation>, EngineError> {
  if percentage == 0 || percentage > 100 {
    return Err(EngineError::invalid("percentage", "must be between 1 and 100"));
  }
  let recover_within = match duration::parse_seconds(recover_within) {
    Ok(secs) if secs > 0 => i64::try_from(secs).unwrap_or(i64::MAX),
    _ => {
      return Err(EngineError::invalid(
        "recover_within",
        "failed to parse recover-within duration",
      ))
    }
  };

  let mut retained: Vec<Retained> = rows
    .iter()
    .filter_map(|row| {
      let incident_key = row.incident_key.as_deref()?;
      let percentile = row.percentile_resolve_seconds?;
      if percentile > recover_within || row.count < more_than {
        return None;
      }
      Some(Retained {
        incident_key,
        count: row.count,
        percentile,
      })
    })
    .collect();

  // Stable sorts: equal keys keep input order.
  match sort_by {
    SortBy::Frequency => retained.sort_by(|a, b| b.count.cmp(&a.count)),
    SortBy::Threshold => retained.sort_by_key(|r| r.percentile),
    SortBy::IncidentKey => retained.sort_by(|a, b| a.incident_key.cmp(b.incident_key)),
  }

  Ok(
    retained
      .into_iter()
      .map(|r| {
        let threshold_seconds = r.percentile.saturating_add(THRESHOLD_MARGIN_SECS);
        ThresholdRecommendation {
          incident_key: r.incident_key.to_string(),
          count: r.count,
          fixed_count: r.count.saturating_mul(u64::from(percentage)) / 100,
          threshold_seconds,
          formatted_threshold: duration::format_threshold(threshold_seconds),
        }
      })
      .collect(),
  )
}
