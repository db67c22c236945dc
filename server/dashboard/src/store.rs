//! Storage collaborator: grouped aggregate queries and point writes over the incident series.

use alert_engine::types::{Granularity, StoredIncident};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::date::TimeWindow;
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
  Count,
  Percentile(u32),
  Max,
  Mean,
}

/// One aggregate column: `func(field) AS alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
  pub func: Aggregate,
  pub field: &'static str,
  pub alias: &'static str,
}

impl Metric {
  pub fn count(field: &'static str) -> Self {
    Self { func: Aggregate::Count, field, alias: "count" }
  }

  pub fn percentile(field: &'static str, percent: u32) -> Self {
    Self { func: Aggregate::Percentile(percent), field, alias: "percentile" }
  }

  pub fn max(field: &'static str) -> Self {
    Self { func: Aggregate::Max, field, alias: "max" }
  }

  pub fn mean(field: &'static str, alias: &'static str) -> Self {
    Self { func: Aggregate::Mean, field, alias }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupBy {
  Tag(&'static str),
  Time(Granularity),
}

/// A numeric comparison on a field, ANDed onto the time range.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
  pub field: &'static str,
  pub less_than: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
  pub window: TimeWindow,
  pub metrics: Vec<Metric>,
  pub condition: Option<Condition>,
  pub group_by: Vec<GroupBy>,
  /// Emit empty time buckets with zero.
  pub fill_zero: bool,
}

impl AggregateQuery {
  pub fn new(window: TimeWindow, metrics: Vec<Metric>) -> Self {
    Self {
      window,
      metrics,
      condition: None,
      group_by: Vec::new(),
      fill_zero: false,
    }
  }

  pub fn group_by(mut self, group: GroupBy) -> Self {
    self.group_by.push(group);
    self
  }

  pub fn condition(mut self, condition: Condition) -> Self {
    self.condition = Some(condition);
    self
  }

  pub fn fill_zero(mut self) -> Self {
    self.fill_zero = true;
    self
  }
}

/// One untyped result row. Typed conversion happens in `fetch`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesRow {
  pub tags: BTreeMap<String, String>,
  pub values: BTreeMap<String, Value>,
}

impl SeriesRow {
  /// Tag or string column; empty strings count as missing.
  pub fn text(&self, name: &str) -> Option<&str> {
    self
      .tags
      .get(name)
      .map(String::as_str)
      .or_else(|| self.values.get(name).and_then(Value::as_str))
      .filter(|s| !s.is_empty())
  }

  /// Integer column; floats are truncated.
  pub fn int(&self, name: &str) -> Option<i64> {
    let v = self.values.get(name)?;
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
  }

  pub fn float(&self, name: &str) -> Option<f64> {
    self.values.get(name).and_then(Value::as_f64)
  }

  pub fn time(&self) -> Option<i64> {
    self.int("time")
  }
}

/// Typed view of a raw incident point. `id` and `time` are required.
pub fn stored_incident(row: &SeriesRow) -> Option<StoredIncident> {
  let text = |name: &str| row.text(name).map(str::to_string);
  Some(StoredIncident {
    id: text("id")?,
    time: row.time()?,
    incident_key: text("incident_key"),
    input_type: text("input_type").unwrap_or_default(),
    description: text("description"),
    category: text("category").unwrap_or_else(|| crate::types::DEFAULT_CATEGORY.to_string()),
    entity: text("entity"),
    check: text("check"),
    acknowledge_by: text("acknowledge_by"),
    time_to_ack: row.int("time_to_ack"),
    time_to_resolve: row.int("time_to_resolve"),
  })
}

#[async_trait]
pub trait IncidentStore: Send + Sync {
  async fn query_aggregate(&self, query: &AggregateQuery) -> Result<Vec<SeriesRow>, StoreError>;

  /// Raw points in the window; all columns when `fields` is empty.
  async fn query_points(
    &self,
    window: &TimeWindow,
    fields: &[&str],
  ) -> Result<Vec<SeriesRow>, StoreError>;

  /// Write (or overwrite, same time + tags) one incident point.
  async fn write_point(&self, incident: &StoredIncident) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn row(values: Value) -> SeriesRow {
    SeriesRow {
      tags: BTreeMap::new(),
      values: serde_json::from_value(values).unwrap(),
    }
  }

  #[test]
  fn text_prefers_tags_and_skips_empty() {
    let mut r = row(json!({"incident_key": "from-column", "input_type": ""}));
    r.tags.insert("incident_key".into(), "from-tag".into());
    assert_eq!(r.text("incident_key"), Some("from-tag"));
    assert_eq!(r.text("input_type"), None);
    assert_eq!(r.text("missing"), None);
  }

  #[test]
  fn numbers_are_truncated_to_ints() {
    let r = row(json!({"time": 1700000000, "percentile": 42.9, "max": null}));
    assert_eq!(r.time(), Some(1_700_000_000));
    assert_eq!(r.int("percentile"), Some(42));
    assert_eq!(r.int("max"), None);
    assert_eq!(r.float("percentile"), Some(42.9));
  }

  #[test]
  fn stored_incident_requires_id_and_time() {
    let r = row(json!({
      "time": 1700000000, "id": "PABC", "incident_key": "web-01:disk", "input_type": "Sensu",
      "time_to_resolve": 30
    }));
    let incident = stored_incident(&r).unwrap();
    assert_eq!(incident.id, "PABC");
    assert_eq!(incident.category, "not set");
    assert!(incident.is_resolved());

    assert!(stored_incident(&row(json!({"id": "PABC"}))).is_none());
  }
}
