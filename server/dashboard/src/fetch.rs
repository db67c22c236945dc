//! Aggregate fetchers: typed store queries feeding the engine reports.

use alert_engine::duration::parse_seconds;
use alert_engine::report;
use alert_engine::types::{
  AlertResponse, BucketCount, BucketMeansRow, FrequencyEntry, Granularity, IncidentAggregateRow,
  NoiseCandidate, SignatureCountRow, StoredIncident,
};
use alert_engine::{recommend, SignatureParser, SortBy, ThresholdRecommendation};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::date::TimeWindow;
use crate::error::{DashboardError, StoreError};
use crate::store::{
  stored_incident, AggregateQuery, Condition, GroupBy, IncidentStore, Metric, SeriesRow,
};

const SIGNATURE_TAGS: [GroupBy; 2] = [GroupBy::Tag("incident_key"), GroupBy::Tag("input_type")];

fn by_signature(mut query: AggregateQuery) -> AggregateQuery {
  query.group_by.extend(SIGNATURE_TAGS);
  query
}

fn count(row: &SeriesRow) -> u64 {
  row.int("count").map(|c| c.max(0) as u64).unwrap_or(0)
}

fn input_type(row: &SeriesRow) -> String {
  row.text("input_type").unwrap_or_default().to_string()
}

/// Per-signature count, resolve-time percentile and max over the window.
pub async fn threshold_rows(
  store: &dyn IncidentStore,
  window: TimeWindow,
  percentage: u32,
) -> Result<Vec<IncidentAggregateRow>, StoreError> {
  let query = by_signature(AggregateQuery::new(
    window,
    vec![
      Metric::count("id"),
      Metric::percentile("time_to_resolve", percentage),
      Metric::max("time_to_resolve"),
    ],
  ));
  let rows = store.query_aggregate(&query).await?;
  Ok(
    rows
      .iter()
      .map(|row| IncidentAggregateRow {
        incident_key: row.text("incident_key").map(str::to_string),
        count: count(row),
        percentile_resolve_seconds: row.int("percentile"),
        max_resolve_seconds: row.int("max"),
      })
      .collect(),
  )
}

/// Threshold recommendation inputs, shared by the CLI and the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdRequest {
  pub percentage: u32,
  pub time_period: String,
  pub more_than: u64,
  pub recover_within: String,
  pub sort_by: SortBy,
}

/// Validate the request, query the last `time_period`, and recommend thresholds.
pub async fn threshold_recommendations(
  store: &dyn IncidentStore,
  request: &ThresholdRequest,
  now: DateTime<Utc>,
) -> Result<Vec<ThresholdRecommendation>, DashboardError> {
  if !(1..=100).contains(&request.percentage) {
    return Err(DashboardError::invalid("percentage", "must be between 1 and 100"));
  }
  let period = parse_seconds(&request.time_period)
    .ok()
    .filter(|secs| *secs > 0)
    .ok_or_else(|| DashboardError::invalid("time_period", "failed to parse time period"))?;
  if !parse_seconds(&request.recover_within).is_ok_and(|secs| secs > 0) {
    return Err(DashboardError::invalid(
      "recover_within",
      "failed to parse recover-within duration",
    ));
  }
  let window = TimeWindow::lookback(period, now);
  debug!(
    percentage = request.percentage,
    start = %window.start,
    end = %window.end,
    "fetching threshold rows"
  );

  let rows = threshold_rows(store, window, request.percentage).await?;
  Ok(recommend(
    &rows,
    request.percentage,
    request.more_than,
    &request.recover_within,
    request.sort_by,
  )?)
}

/// Alert counts per signature, most frequent first.
pub async fn frequency<P>(
  store: &dyn IncidentStore,
  window: TimeWindow,
  parser: &P,
) -> Result<Vec<FrequencyEntry>, StoreError>
where
  P: SignatureParser + Sync + ?Sized,
{
  let query = by_signature(AggregateQuery::new(window, vec![Metric::count("id")]));
  let rows: Vec<SignatureCountRow> = store
    .query_aggregate(&query)
    .await?
    .iter()
    .map(|row| SignatureCountRow {
      incident_key: row.text("incident_key").map(str::to_string),
      input_type: input_type(row),
      count: count(row),
      mean_resolve_seconds: None,
    })
    .collect();
  Ok(report::frequency(&rows, parser))
}

/// Signatures resolving within `max_resolve_secs`, most frequent first.
pub async fn noise_candidates<P>(
  store: &dyn IncidentStore,
  window: TimeWindow,
  parser: &P,
  max_resolve_secs: u64,
) -> Result<Vec<NoiseCandidate>, StoreError>
where
  P: SignatureParser + Sync + ?Sized,
{
  let query = by_signature(
    AggregateQuery::new(
      window,
      vec![Metric::count("id"), Metric::mean("time_to_resolve", "mean")],
    )
    .condition(Condition {
      field: "time_to_resolve",
      less_than: max_resolve_secs as f64,
    }),
  );
  let rows: Vec<SignatureCountRow> = store
    .query_aggregate(&query)
    .await?
    .iter()
    .map(|row| SignatureCountRow {
      incident_key: row.text("incident_key").map(str::to_string),
      input_type: input_type(row),
      count: count(row),
      mean_resolve_seconds: row.float("mean"),
    })
    .collect();
  Ok(report::noise_candidates(&rows, parser))
}

/// Every stored incident in the window, oldest first.
pub async fn incidents(
  store: &dyn IncidentStore,
  window: TimeWindow,
) -> Result<Vec<StoredIncident>, StoreError> {
  let mut points: Vec<StoredIncident> = store
    .query_points(&window, &[])
    .await?
    .iter()
    .filter_map(stored_incident)
    .collect();
  points.sort_by_key(|p| p.time);
  Ok(points)
}

/// Per-incident response times, plus bucketed means and counts for longer spans.
pub async fn alert_response(
  store: &dyn IncidentStore,
  window: TimeWindow,
) -> Result<AlertResponse, StoreError> {
  let points = incidents(store, window).await?;
  let responses = report::response_incidents(&points);
  if responses.is_empty() {
    return Ok(report::alert_response(Vec::new(), None, Vec::new(), Granularity::Hour));
  }

  let granularity = Granularity::for_incidents(&responses);
  let means = match granularity {
    Some(bucket) => {
      let query = AggregateQuery::new(
        window,
        vec![
          Metric::mean("time_to_ack", "mean_ack"),
          Metric::mean("time_to_resolve", "mean_resolve"),
        ],
      )
      .group_by(GroupBy::Time(bucket))
      .group_by(GroupBy::Tag("input_type"));
      let rows = store.query_aggregate(&query).await?;
      Some(
        rows
          .iter()
          .filter_map(|row| {
            Some(BucketMeansRow {
              time: row.time()?,
              input_type: input_type(row),
              mean_ack: row.float("mean_ack"),
              mean_resolve: row.float("mean_resolve"),
            })
          })
          .collect::<Vec<_>>(),
      )
    }
    None => None,
  };

  let count_group_by = Granularity::for_counts(granularity);
  let query = AggregateQuery::new(window, vec![Metric::count("id")])
    .group_by(GroupBy::Time(count_group_by))
    .group_by(GroupBy::Tag("input_type"))
    .fill_zero();
  let counts: Vec<BucketCount> = store
    .query_aggregate(&query)
    .await?
    .iter()
    .filter_map(|row| {
      Some(BucketCount {
        time: row.time()?,
        input_type: input_type(row),
        count: count(row),
      })
    })
    .collect();

  Ok(report::alert_response(
    responses,
    means.as_deref(),
    counts,
    count_group_by,
  ))
}
