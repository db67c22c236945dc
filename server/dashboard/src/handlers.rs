//! HTTP handlers for the dashboard API.

use alert_engine::oncall::oncall_window;
use alert_engine::series::{frequency_series, response_series};
use alert_engine::SortBy;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::date::{parse_day, TimeWindow};
use crate::error::DashboardError;
use crate::fetch::{self, ThresholdRequest};
use crate::ingest::{self, SyncReport};
use crate::state::AppState;
use crate::types::{
  Breakdown, CategoriesSaved, DayIncidents, NoiseReport, OncallParams, OncallReport,
  ResponseReport, SyncRequest, ThresholdParams, ThresholdReport, CATEGORIES,
};

pub const DEFAULT_TIME_PERIOD: &str = "1 day";
pub const DEFAULT_MORE_THAN: u64 = 5;

type ApiResult<T> = Result<Json<T>, DashboardError>;

pub async fn health() -> &'static str {
  "ok"
}

fn day_window(date: NaiveDate) -> Result<TimeWindow, DashboardError> {
  TimeWindow::days(date, date, Utc::now())
}

fn range_window(start: &str, end: &str) -> Result<TimeWindow, DashboardError> {
  let (first, last) = (parse_day(start)?, parse_day(end)?);
  if last < first {
    return Err(DashboardError::invalid("end", "end date is before start date"));
  }
  TimeWindow::days(first, last, Utc::now())
}

pub async fn day_incidents(
  State(state): State<Arc<AppState>>,
  Path(date): Path<String>,
) -> ApiResult<DayIncidents> {
  let date = parse_day(&date)?;
  let incidents = fetch::incidents(state.store.as_ref(), day_window(date)?).await?;
  Ok(Json(DayIncidents {
    date,
    incidents,
    categories: &CATEGORIES,
  }))
}

pub async fn save_day_categories(
  State(state): State<Arc<AppState>>,
  Path(date): Path<String>,
  body: Result<Json<BTreeMap<String, String>>, JsonRejection>,
) -> ApiResult<CategoriesSaved> {
  let date = parse_day(&date)?;
  let Json(assignments) = body.map_err(|e| DashboardError::invalid("body", &e.body_text()))?;
  let saved = ingest::save_categories(state.store.as_ref(), &day_window(date)?, &assignments).await?;
  Ok(Json(CategoriesSaved { saved }))
}

pub async fn breakdown(
  State(state): State<Arc<AppState>>,
  Path((start, end)): Path<(String, String)>,
) -> ApiResult<Breakdown> {
  let window = range_window(&start, &end)?;
  let incidents = fetch::frequency(state.store.as_ref(), window, state.parser.as_ref()).await?;
  Ok(Json(Breakdown {
    window,
    total: alert_engine::report::total(&incidents),
    series: frequency_series(&incidents, &state.report),
    incidents,
  }))
}

pub async fn noise(
  State(state): State<Arc<AppState>>,
  Path((start, end)): Path<(String, String)>,
) -> ApiResult<NoiseReport> {
  let window = range_window(&start, &end)?;
  let candidates = fetch::noise_candidates(
    state.store.as_ref(),
    window,
    state.parser.as_ref(),
    state.report.noise_max_resolve_secs,
  )
  .await?;
  Ok(Json(NoiseReport { window, candidates }))
}

pub async fn response(
  State(state): State<Arc<AppState>>,
  Path((start, end)): Path<(String, String)>,
) -> ApiResult<ResponseReport> {
  let window = range_window(&start, &end)?;
  let report = fetch::alert_response(state.store.as_ref(), window).await?;
  Ok(Json(ResponseReport {
    window,
    series: response_series(&report),
    report,
  }))
}

pub async fn thresholds(
  State(state): State<Arc<AppState>>,
  params: Result<Query<ThresholdParams>, QueryRejection>,
) -> ApiResult<ThresholdReport> {
  let Query(params) = params.map_err(|e| DashboardError::invalid("query", &e.body_text()))?;
  let sort_by = match params.sort_by.as_deref() {
    Some(s) => s.parse()?,
    None => SortBy::Frequency,
  };
  let request = ThresholdRequest {
    percentage: params.percent_to_remove,
    time_period: params.time_period.unwrap_or_else(|| DEFAULT_TIME_PERIOD.to_string()),
    more_than: params.more_than.unwrap_or(DEFAULT_MORE_THAN),
    recover_within: params.recover_within,
    sort_by,
  };
  let recommendations =
    fetch::threshold_recommendations(state.store.as_ref(), &request, Utc::now()).await?;
  Ok(Json(ThresholdReport {
    total: recommendations.len(),
    recommendations,
  }))
}

pub async fn oncall(
  State(state): State<Arc<AppState>>,
  params: Result<Query<OncallParams>, QueryRejection>,
) -> ApiResult<OncallReport> {
  let Query(params) = params.map_err(|e| DashboardError::invalid("date", &e.body_text()))?;
  let at = match params.date {
    Some(date) => date.and_time(NaiveTime::default()),
    None => Utc::now().naive_utc(),
  };
  let (since, until) =
    oncall_window(at).ok_or_else(|| DashboardError::invalid("date", "out of range"))?;

  let mut schedules = BTreeMap::new();
  for (name, schedule_id) in &state.schedules {
    let emails = state.feed.oncall_emails(schedule_id, since, until).await?;
    schedules.insert(name.clone(), emails);
  }
  Ok(Json(OncallReport {
    since,
    until,
    schedules,
  }))
}

pub async fn sync(
  State(state): State<Arc<AppState>>,
  body: Result<Json<SyncRequest>, JsonRejection>,
) -> ApiResult<SyncReport> {
  let Json(request) = body.map_err(|e| DashboardError::invalid("body", &e.body_text()))?;
  if let Some(until) = request.until {
    if until <= request.since {
      return Err(DashboardError::invalid("until", "until must be after since"));
    }
  }
  info!(since = %request.since, until = ?request.until, "sync requested");
  let report = ingest::sync(
    state.feed.clone(),
    state.store.as_ref(),
    state.parser.as_ref(),
    request.since,
    request.until,
    state.ingest,
  )
  .await?;
  Ok(Json(report))
}
