//! Integration tests for the alert engine.

use alert_engine::types::RecommendInput;
use alert_engine::{recommend, EngineError, SortBy};

fn fixture_input() -> RecommendInput {
  let json = r#"{
    "rows": [
      {"incident_key": "web-01:check-http", "count": 42, "percentile_resolve_seconds": 35, "max_resolve_seconds": 600},
      {"incident_key": "db-01:check-load", "count": 12, "percentile_resolve_seconds": 95, "max_resolve_seconds": 140},
      {"incident_key": null, "count": 80, "percentile_resolve_seconds": 10},
      {"incident_key": "cache-01:check-mem", "count": 30, "percentile_resolve_seconds": null},
      {"incident_key": "batch-01:check-cron", "count": 2, "percentile_resolve_seconds": 5},
      {"incident_key": "app-01:check-disk", "count": 12, "percentile_resolve_seconds": 400}
    ],
    "percentage": 50,
    "more_than": 5,
    "recover_within": "5 minutes",
    "sort_by": "frequency"
  }"#;
  serde_json::from_str(json).unwrap()
}

#[test]
fn fixture_produces_ranked_recommendations() {
  let input = fixture_input();
  let sort_by: SortBy = input.sort_by.parse().unwrap();
  let recs = recommend(
    &input.rows,
    input.percentage,
    input.more_than,
    &input.recover_within,
    sort_by,
  )
  .unwrap();

  let keys: Vec<_> = recs.iter().map(|r| r.incident_key.as_str()).collect();
  assert_eq!(keys, ["web-01:check-http", "db-01:check-load"]);

  assert_eq!(recs[0].fixed_count, 21);
  assert_eq!(recs[0].formatted_threshold, "40 seconds");
  assert_eq!(recs[1].fixed_count, 6);
  assert_eq!(recs[1].threshold_seconds, 100);
  assert_eq!(recs[1].formatted_threshold, "1 minute and 40 seconds");
}

#[test]
fn deterministic_output_across_runs() {
  let input = fixture_input();
  let run = || {
    let recs = recommend(&input.rows, 50, 5, "5 minutes", SortBy::Threshold).unwrap();
    serde_json::to_string(&recs).unwrap()
  };
  assert_eq!(run(), run(), "Same inputs must produce identical JSON output");
}

#[test]
fn missing_optional_fields_default_to_null() {
  let json = r#"{
    "rows": [{"count": 3}],
    "percentage": 10,
    "recover_within": "1 minute"
  }"#;
  let input: RecommendInput = serde_json::from_str(json).unwrap();
  assert_eq!(input.sort_by, "frequency");
  assert_eq!(input.more_than, 0);
  assert!(input.rows[0].incident_key.is_none());

  let recs = recommend(&input.rows, input.percentage, input.more_than, &input.recover_within, SortBy::Frequency).unwrap();
  assert!(recs.is_empty());
}

#[test]
fn unparseable_window_gives_clear_error() {
  let input = fixture_input();
  let err = recommend(&input.rows, 50, 5, "whenever", SortBy::Frequency).unwrap_err();
  assert!(matches!(err, EngineError::InvalidArgument { .. }));
  assert!(
    err.to_string().contains("recover_within"),
    "Error should mention the field: {}",
    err
  );
}

#[test]
fn invalid_sort_field_rejected_before_recommending() {
  let err = "max".parse::<SortBy>().unwrap_err();
  assert!(err.to_string().contains("sort_by"));
}
