//! Request and response payloads for the HTTP API.

use alert_engine::types::{
  AlertResponse, ChartSeries, FrequencyEntry, NoiseCandidate, StoredIncident,
  ThresholdRecommendation,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::date::TimeWindow;

pub const DEFAULT_CATEGORY: &str = "not set";

/// Categories an operator can assign to an incident.
pub const CATEGORIES: [&str; 6] = [
  DEFAULT_CATEGORY,
  "real",
  "improved",
  "self recovered",
  "needs documentation",
  "unclear, needs discussion",
];

pub fn is_category(name: &str) -> bool {
  CATEGORIES.contains(&name)
}

#[derive(Debug, Serialize)]
pub struct DayIncidents {
  pub date: NaiveDate,
  pub incidents: Vec<StoredIncident>,
  pub categories: &'static [&'static str],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesSaved {
  pub saved: usize,
}

#[derive(Debug, Serialize)]
pub struct Breakdown {
  pub window: TimeWindow,
  pub total: u64,
  pub incidents: Vec<FrequencyEntry>,
  pub series: Vec<ChartSeries>,
}

#[derive(Debug, Serialize)]
pub struct NoiseReport {
  pub window: TimeWindow,
  pub candidates: Vec<NoiseCandidate>,
}

#[derive(Debug, Serialize)]
pub struct ResponseReport {
  pub window: TimeWindow,
  #[serde(flatten)]
  pub report: AlertResponse,
  pub series: Vec<ChartSeries>,
}

/// Query string of `/api/thresholds`, mirroring the CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdParams {
  pub percent_to_remove: u32,
  pub recover_within: String,
  pub time_period: Option<String>,
  pub more_than: Option<u64>,
  pub sort_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThresholdReport {
  pub recommendations: Vec<ThresholdRecommendation>,
  pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct OncallParams {
  pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct OncallReport {
  pub since: NaiveDateTime,
  pub until: NaiveDateTime,
  /// Schedule name -> emails of users on call.
  pub schedules: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
  pub since: DateTime<Utc>,
  pub until: Option<DateTime<Utc>>,
}
