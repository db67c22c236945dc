//! Core types for the alert engine (typed rows in, report/recommendation models out).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Aggregate rows (typed at the storage boundary)
// ---------------------------------------------------------------------------

/// One grouped row per incident signature within a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentAggregateRow {
  #[serde(default)]
  pub incident_key: Option<String>,
  pub count: u64,
  /// P-th percentile of time-to-resolve; `None` when nothing in the group resolved.
  #[serde(default)]
  pub percentile_resolve_seconds: Option<i64>,
  /// Informational only.
  #[serde(default)]
  pub max_resolve_seconds: Option<i64>,
}

/// Count per incident signature, optionally with mean resolve time (noise candidates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureCountRow {
  #[serde(default)]
  pub incident_key: Option<String>,
  #[serde(default)]
  pub input_type: String,
  pub count: u64,
  #[serde(default)]
  pub mean_resolve_seconds: Option<f64>,
}

/// One bucketed mean of ack/resolve times (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketMeansRow {
  pub time: i64,
  #[serde(default)]
  pub input_type: String,
  pub mean_ack: Option<f64>,
  pub mean_resolve: Option<f64>,
}

/// One bucketed incident count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCount {
  pub time: i64,
  #[serde(default)]
  pub input_type: String,
  pub count: u64,
}

// ---------------------------------------------------------------------------
// Stored incident (one point in the incident series)
// ---------------------------------------------------------------------------

/// An incident as persisted in the time-series store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredIncident {
  pub id: String,
  /// Epoch seconds of `created_on`.
  pub time: i64,
  pub incident_key: Option<String>,
  pub input_type: String,
  pub description: Option<String>,
  pub category: String,
  pub entity: Option<String>,
  pub check: Option<String>,
  pub acknowledge_by: Option<String>,
  pub time_to_ack: Option<i64>,
  pub time_to_resolve: Option<i64>,
}

impl StoredIncident {
  pub fn is_resolved(&self) -> bool {
    self.time_to_resolve.is_some()
  }
}

// ---------------------------------------------------------------------------
// Threshold recommendation
// ---------------------------------------------------------------------------

/// Which field recommendations are ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
  /// Count, highest first.
  Frequency,
  /// Percentile resolve time, lowest first.
  Threshold,
  /// Incident key, lexical.
  IncidentKey,
}

impl SortBy {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Frequency => "frequency",
      Self::Threshold => "threshold",
      Self::IncidentKey => "incident_key",
    }
  }
}

impl FromStr for SortBy {
  type Err = EngineError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "frequency" => Ok(Self::Frequency),
      "threshold" | "percentile" => Ok(Self::Threshold),
      "incident_key" => Ok(Self::IncidentKey),
      _ => Err(EngineError::invalid(
        "sort_by",
        "must be one of frequency, threshold, or incident_key",
      )),
    }
  }
}

impl fmt::Display for SortBy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRecommendation {
  pub incident_key: String,
  pub count: u64,
  /// Alerts a threshold at this percentile would have suppressed.
  pub fixed_count: u64,
  pub threshold_seconds: i64,
  pub formatted_threshold: String,
}

// ---------------------------------------------------------------------------
// Report outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
  pub entity: String,
  pub check: Option<String>,
  pub input_type: String,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseCandidate {
  pub entity: String,
  pub check: Option<String>,
  pub input_type: String,
  pub count: u64,
  pub mean_time_to_resolve: i64,
}

/// Per-incident response times in whole minutes (rounded up, unknown = 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseIncident {
  pub id: String,
  pub alert_time: i64,
  pub incident_key: String,
  pub ack_by: Option<String>,
  pub time_to_ack: i64,
  pub time_to_resolve: i64,
  pub input_type: String,
}

/// Bucketed mean response times in whole minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketMeans {
  pub time: i64,
  pub input_type: String,
  pub mean_ack: i64,
  pub mean_resolve: i64,
}

/// Bucket width for aggregated response queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
  #[serde(rename = "1h")]
  Hour,
  #[serde(rename = "8h")]
  EightHours,
  #[serde(rename = "24h")]
  Day,
}

impl Granularity {
  /// InfluxQL duration literal.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Hour => "1h",
      Self::EightHours => "8h",
      Self::Day => "24h",
    }
  }
}

impl fmt::Display for Granularity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertResponse {
  pub incidents: Vec<ResponseIncident>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub aggregated: Option<Vec<BucketMeans>>,
  pub count: Vec<BucketCount>,
  pub count_group_by: Granularity,
}

// ---------------------------------------------------------------------------
// Chart series (Highcharts-shaped JSON)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
  pub name: String,
  pub x: i64,
  pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SeriesData {
  Values(Vec<u64>),
  Pairs(Vec<(i64, i64)>),
  Points(Vec<SeriesPoint>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tooltip {
  #[serde(rename = "valueSuffix")]
  pub value_suffix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
  pub name: String,
  pub data: SeriesData,
  #[serde(rename = "dashStyle", skip_serializing_if = "Option::is_none")]
  pub dash_style: Option<String>,
  #[serde(rename = "yAxis", skip_serializing_if = "Option::is_none")]
  pub y_axis: Option<u8>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tooltip: Option<Tooltip>,
}

impl ChartSeries {
  pub fn new(name: impl Into<String>, data: SeriesData) -> Self {
    Self {
      name: name.into(),
      data,
      dash_style: None,
      y_axis: None,
      tooltip: None,
    }
  }
}

// ---------------------------------------------------------------------------
// Paging-service log entries + derived timing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryKind {
  Trigger,
  Acknowledge,
  Resolve,
  #[serde(other)]
  Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
  #[serde(rename = "type")]
  pub kind: LogEntryKind,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub agent_email: Option<String>,
}

/// Acknowledge/resolve timing for one incident. All fields unknown when the lookup failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentTiming {
  pub acknowledge_by: Option<String>,
  pub time_to_ack: Option<i64>,
  pub time_to_resolve: Option<i64>,
}

impl IncidentTiming {
  pub fn unknown() -> Self {
    Self::default()
  }
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// One recommendation request read from stdin by the engine binary.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendInput {
  pub rows: Vec<IncidentAggregateRow>,
  pub percentage: u32,
  #[serde(default)]
  pub more_than: u64,
  pub recover_within: String,
  #[serde(default = "default_sort_by")]
  pub sort_by: String,
}

fn default_sort_by() -> String {
  SortBy::Frequency.as_str().to_string()
}

/// Structured error output for invalid input.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}
