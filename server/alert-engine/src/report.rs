//! Dashboard reports: alert frequency, noise candidates, alert response.
//!
//! Rows arrive already grouped by the store; these functions drop unkeyed rows, split
//! incident keys into entity/check, rank, and convert seconds to minutes for display.

use crate::duration::ceil_minutes;
use crate::signature::SignatureParser;
use crate::types::{
  AlertResponse, BucketCount, BucketMeans, BucketMeansRow, FrequencyEntry, Granularity,
  NoiseCandidate, ResponseIncident, SignatureCountRow, StoredIncident,
};

const WEEK_SECS: i64 = 7 * 24 * 60 * 60;

/// Alert counts per signature, most frequent first.
pub fn frequency<P>(rows: &[SignatureCountRow], parser: &P) -> Vec<FrequencyEntry>
where
  P: SignatureParser + ?Sized,
{
  let mut entries: Vec<FrequencyEntry> = rows
    .iter()
    .filter_map(|row| {
      let key = row.incident_key.as_deref()?;
      let sig = parser.parse(key, &row.input_type);
      Some(FrequencyEntry {
        entity: sig.entity,
        check: sig.check,
        input_type: row.input_type.clone(),
        count: row.count,
      })
    })
    .collect();
  entries.sort_by(|a, b| b.count.cmp(&a.count));
  entries
}

/// Sum of all counts in a frequency breakdown.
pub fn total(entries: &[FrequencyEntry]) -> u64 {
  entries.iter().map(|e| e.count).sum()
}

/// Signatures that fire often and resolve on their own quickly, most frequent first.
///
/// The store is expected to have restricted rows to quickly-resolved incidents already.
pub fn noise_candidates<P>(rows: &[SignatureCountRow], parser: &P) -> Vec<NoiseCandidate>
where
  P: SignatureParser + ?Sized,
{
  let mut candidates: Vec<NoiseCandidate> = rows
    .iter()
    .filter_map(|row| {
      let key = row.incident_key.as_deref()?;
      let sig = parser.parse(key, &row.input_type);
      Some(NoiseCandidate {
        entity: sig.entity,
        check: sig.check,
        input_type: row.input_type.clone(),
        count: row.count,
        mean_time_to_resolve: row.mean_resolve_seconds.map(|m| m as i64).unwrap_or(0),
      })
    })
    .collect();
  candidates.sort_by(|a, b| b.count.cmp(&a.count));
  candidates
}

/// Per-incident ack/resolve times in minutes; incidents without a key are skipped.
pub fn response_incidents(points: &[StoredIncident]) -> Vec<ResponseIncident> {
  points
    .iter()
    .filter_map(|p| {
      let key = p.incident_key.as_deref()?;
      Some(ResponseIncident {
        id: p.id.clone(),
        alert_time: p.time,
        incident_key: key.trim().to_string(),
        ack_by: p.acknowledge_by.clone(),
        time_to_ack: ceil_minutes(p.time_to_ack.map(|s| s as f64)),
        time_to_resolve: ceil_minutes(p.time_to_resolve.map(|s| s as f64)),
        input_type: p.input_type.clone(),
      })
    })
    .collect()
}

impl Granularity {
  /// Bucket width for a span of alerts; `None` means every point is meaningful.
  ///
  /// Under a week: none. One to four weeks: hourly. Under a year: 8 hours. Otherwise daily.
  pub fn for_span(span_secs: i64) -> Option<Self> {
    if span_secs < WEEK_SECS {
      None
    } else if span_secs <= 4 * WEEK_SECS {
      Some(Self::Hour)
    } else if span_secs < 52 * WEEK_SECS {
      Some(Self::EightHours)
    } else {
      Some(Self::Day)
    }
  }

  /// Granularity for the span covered by `incidents`.
  pub fn for_incidents(incidents: &[ResponseIncident]) -> Option<Self> {
    let first = incidents.iter().map(|i| i.alert_time).min()?;
    let last = incidents.iter().map(|i| i.alert_time).max()?;
    Self::for_span(last - first)
  }

  /// Counts are always bucketed, at least hourly.
  pub fn for_counts(granularity: Option<Self>) -> Self {
    granularity.unwrap_or(Self::Hour)
  }
}

/// Assemble the response report. `means` is only present when `granularity` bucketed the data.
pub fn alert_response(
  incidents: Vec<ResponseIncident>,
  means: Option<&[BucketMeansRow]>,
  mut counts: Vec<BucketCount>,
  count_group_by: Granularity,
) -> AlertResponse {
  let aggregated = means.map(|rows| {
    rows
      .iter()
      .map(|r| BucketMeans {
        time: r.time,
        input_type: r.input_type.clone(),
        mean_ack: ceil_minutes(r.mean_ack),
        mean_resolve: ceil_minutes(r.mean_resolve),
      })
      .collect()
  });
  counts.sort_by(|a, b| b.count.cmp(&a.count));

  AlertResponse {
    incidents,
    aggregated,
    count: counts,
    count_group_by,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::signature::KeyHeuristics;

  fn count_row(key: Option<&str>, input_type: &str, count: u64) -> SignatureCountRow {
    SignatureCountRow {
      incident_key: key.map(str::to_string),
      input_type: input_type.into(),
      count,
      mean_resolve_seconds: None,
    }
  }

  fn point(id: &str, time: i64, key: Option<&str>) -> StoredIncident {
    StoredIncident {
      id: id.into(),
      time,
      incident_key: key.map(str::to_string),
      input_type: "Sensu".into(),
      description: None,
      category: "not set".into(),
      entity: None,
      check: None,
      acknowledge_by: Some("oncall@example.com".into()),
      time_to_ack: Some(61),
      time_to_resolve: None,
    }
  }

  #[test]
  fn frequency_ranks_and_splits_keys() {
    let rows = vec![
      count_row(Some("web-01:disk"), "Sensu", 3),
      count_row(None, "Sensu", 100),
      count_row(Some("db-01:load"), "Sensu", 9),
    ];
    let entries = frequency(&rows, &KeyHeuristics);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].entity, "db-01");
    assert_eq!(entries[0].check.as_deref(), Some("load"));
    assert_eq!(entries[1].count, 3);
    assert_eq!(total(&entries), 12);
  }

  #[test]
  fn noise_candidates_truncate_mean() {
    let mut row = count_row(Some("web-01:flap"), "Sensu", 40);
    row.mean_resolve_seconds = Some(31.9);
    let candidates = noise_candidates(&[row], &KeyHeuristics);
    assert_eq!(candidates[0].mean_time_to_resolve, 31);
    assert_eq!(candidates[0].count, 40);
  }

  #[test]
  fn empty_rows_give_empty_reports() {
    assert!(frequency(&[], &KeyHeuristics).is_empty());
    assert!(noise_candidates(&[], &KeyHeuristics).is_empty());
    assert!(response_incidents(&[]).is_empty());
    assert_eq!(Granularity::for_incidents(&[]), None);
  }

  #[test]
  fn response_incidents_round_minutes_up() {
    let incidents = response_incidents(&[point("P1", 100, Some("  web-01:disk ")), point("P2", 200, None)]);
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].incident_key, "web-01:disk");
    assert_eq!(incidents[0].time_to_ack, 2);
    assert_eq!(incidents[0].time_to_resolve, 0);
  }

  #[test]
  fn granularity_by_span() {
    assert_eq!(Granularity::for_span(0), None);
    assert_eq!(Granularity::for_span(WEEK_SECS - 1), None);
    assert_eq!(Granularity::for_span(WEEK_SECS), Some(Granularity::Hour));
    assert_eq!(Granularity::for_span(4 * WEEK_SECS), Some(Granularity::Hour));
    assert_eq!(Granularity::for_span(4 * WEEK_SECS + 1), Some(Granularity::EightHours));
    assert_eq!(Granularity::for_span(52 * WEEK_SECS), Some(Granularity::Day));
    assert_eq!(Granularity::for_counts(None), Granularity::Hour);
  }

  #[test]
  fn alert_response_sorts_counts_and_converts_means() {
    let counts = vec![
      BucketCount { time: 0, input_type: "Sensu".into(), count: 1 },
      BucketCount { time: 3600, input_type: "Sensu".into(), count: 7 },
    ];
    let means = vec![BucketMeansRow {
      time: 0,
      input_type: "Sensu".into(),
      mean_ack: Some(90.0),
      mean_resolve: None,
    }];
    let report = alert_response(Vec::new(), Some(&means), counts, Granularity::Hour);

    assert_eq!(report.count[0].count, 7);
    let aggregated = report.aggregated.unwrap();
    assert_eq!(aggregated[0].mean_ack, 2);
    assert_eq!(aggregated[0].mean_resolve, 0);
  }
}
