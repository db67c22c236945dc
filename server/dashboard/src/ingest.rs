//! Sync pipeline: pull incidents from the paging service, derive ack/resolve timing from their
//! log entries, and upsert them into the incident series.

use alert_engine::timing::derive_timing;
use alert_engine::types::{IncidentTiming, StoredIncident};
use alert_engine::SignatureParser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::date::TimeWindow;
use crate::error::DashboardError;
use crate::pagerduty::{FeedIncident, IncidentFeed};
use crate::store::{stored_incident, IncidentStore};
use crate::types::{is_category, DEFAULT_CATEGORY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
  /// Log-entry lookups in flight at once.
  pub workers: usize,
  /// Bound on each individual lookup.
  pub request_timeout: Duration,
}

impl Default for IngestSettings {
  fn default() -> Self {
    Self::from(&IngestConfig::default())
  }
}

impl From<&IngestConfig> for IngestSettings {
  fn from(config: &IngestConfig) -> Self {
    Self {
      workers: config.workers.max(1),
      request_timeout: config.request_timeout(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
  pub fetched: usize,
  pub inserted: usize,
  pub updated: usize,
  pub skipped: usize,
  /// Incidents whose log-entry lookup failed or timed out.
  pub timing_unknown: usize,
}

/// Look up timing for every incident with bounded concurrency.
///
/// Slot `i` of the result belongs to `incidents[i]`; `None` means the lookup failed or timed out.
pub async fn enrich(
  feed: Arc<dyn IncidentFeed>,
  incidents: &[FeedIncident],
  settings: IngestSettings,
) -> Vec<Option<IncidentTiming>> {
  let sem = Arc::new(Semaphore::new(settings.workers.max(1)));
  let mut join_set = JoinSet::new();

  for (index, incident) in incidents.iter().enumerate() {
    let Ok(permit) = sem.clone().acquire_owned().await else {
      break;
    };
    let feed = feed.clone();
    let id = incident.id.clone();
    let created_on = incident.created_on;
    let limit = settings.request_timeout;
    join_set.spawn(async move {
      let _permit = permit;
      let timing = match timeout(limit, feed.get_log_entries(&id)).await {
        Ok(Ok(entries)) => Some(derive_timing(created_on, &entries)),
        Ok(Err(e)) => {
          warn!(id = %id, error = %e, "log entry lookup failed");
          None
        }
        Err(_) => {
          warn!(id = %id, timeout_ms = limit.as_millis() as u64, "log entry lookup timed out");
          None
        }
      };
      (index, timing)
    });
  }

  let mut timings = vec![None; incidents.len()];
  while let Some(res) = join_set.join_next().await {
    match res {
      Ok((index, timing)) => timings[index] = timing,
      Err(e) => warn!(error = %e, "log entry task failed"),
    }
  }
  timings
}

/// Build the point for an incident; the key is split into entity/check when present.
pub fn to_stored<P>(incident: &FeedIncident, timing: IncidentTiming, parser: &P) -> StoredIncident
where
  P: SignatureParser + ?Sized,
{
  let signature = incident
    .incident_key
    .as_deref()
    .map(|key| parser.parse(key, &incident.service_name));
  StoredIncident {
    id: incident.id.clone(),
    time: incident.created_on.timestamp(),
    incident_key: incident.incident_key.clone(),
    input_type: incident.service_name.clone(),
    description: incident.description.clone(),
    category: DEFAULT_CATEGORY.to_string(),
    entity: signature.as_ref().map(|s| s.entity.clone()),
    check: signature.and_then(|s| s.check),
    acknowledge_by: timing.acknowledge_by,
    time_to_ack: timing.time_to_ack,
    time_to_resolve: timing.time_to_resolve,
  }
}

/// What the store already holds for an incident id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingPoint {
  pub time: i64,
  pub resolved: bool,
  pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteAction {
  Insert,
  /// Overwrite the existing point at its original timestamp.
  Update { time: i64 },
  Skip,
}

/// Resolved points are final; unresolved ones are rewritten with whatever is new.
pub fn plan_write(existing: Option<&ExistingPoint>) -> WriteAction {
  match existing {
    None => WriteAction::Insert,
    Some(point) if point.resolved => WriteAction::Skip,
    Some(point) => WriteAction::Update { time: point.time },
  }
}

/// Insert, update or skip each incident against the points already stored around them.
pub async fn upsert_incidents(
  store: &dyn IncidentStore,
  incidents: Vec<StoredIncident>,
) -> Result<SyncReport, DashboardError> {
  let mut report = SyncReport::default();
  let (Some(oldest), Some(newest)) = (
    incidents.iter().map(|i| i.time).min(),
    incidents.iter().map(|i| i.time).max(),
  ) else {
    return Ok(report);
  };

  let window = TimeWindow::around(oldest, newest);
  let rows = store
    .query_points(&window, &["id", "time_to_resolve", "category"])
    .await?;
  let existing: HashMap<String, ExistingPoint> = rows
    .iter()
    .filter_map(|row| {
      let id = row.text("id")?;
      let point = ExistingPoint {
        time: row.time()?,
        resolved: row.int("time_to_resolve").is_some(),
        category: row.text("category").map(str::to_string),
      };
      Some((id.to_string(), point))
    })
    .collect();

  for mut incident in incidents {
    let current = existing.get(&incident.id);
    match plan_write(current) {
      WriteAction::Insert => {
        debug!(id = %incident.id, "inserting incident");
        store.write_point(&incident).await?;
        report.inserted += 1;
      }
      WriteAction::Update { time } => {
        debug!(id = %incident.id, "incident already stored, updating");
        incident.time = time;
        if let Some(category) = current.and_then(|p| p.category.clone()) {
          incident.category = category;
        }
        store.write_point(&incident).await?;
        report.updated += 1;
      }
      WriteAction::Skip => {
        debug!(id = %incident.id, "incident already resolved, skipping");
        report.skipped += 1;
      }
    }
  }
  Ok(report)
}

/// Fetch, enrich and store every incident created in `[since, until)`.
pub async fn sync<P>(
  feed: Arc<dyn IncidentFeed>,
  store: &dyn IncidentStore,
  parser: &P,
  since: DateTime<Utc>,
  until: Option<DateTime<Utc>>,
  settings: IngestSettings,
) -> Result<SyncReport, DashboardError>
where
  P: SignatureParser + Sync + ?Sized,
{
  let incidents = feed.list_incidents(since, until).await?;
  info!(count = incidents.len(), %since, "fetched incidents");

  let timings = enrich(feed, &incidents, settings).await;
  let timing_unknown = timings.iter().filter(|t| t.is_none()).count();

  let points: Vec<StoredIncident> = incidents
    .iter()
    .zip(timings)
    .map(|(incident, timing)| {
      to_stored(incident, timing.unwrap_or_else(IncidentTiming::unknown), parser)
    })
    .collect();

  let mut report = upsert_incidents(store, points).await?;
  report.fetched = incidents.len();
  report.timing_unknown = timing_unknown;
  info!(
    fetched = report.fetched,
    inserted = report.inserted,
    updated = report.updated,
    skipped = report.skipped,
    timing_unknown = report.timing_unknown,
    "sync complete"
  );
  Ok(report)
}

/// Rewrite the category of each assigned incident in the window; returns how many were saved.
pub async fn save_categories(
  store: &dyn IncidentStore,
  window: &TimeWindow,
  assignments: &BTreeMap<String, String>,
) -> Result<usize, DashboardError> {
  if let Some(bad) = assignments.values().find(|c| !is_category(c)) {
    return Err(DashboardError::invalid(
      "category",
      &format!("unknown category {:?}", bad),
    ));
  }
  if assignments.is_empty() {
    return Ok(0);
  }

  let points: HashMap<String, StoredIncident> = store
    .query_points(window, &[])
    .await?
    .iter()
    .filter_map(stored_incident)
    .map(|p| (p.id.clone(), p))
    .collect();

  let mut saved = 0;
  for (id, category) in assignments {
    let Some(point) = points.get(id) else {
      warn!(id = %id, "no stored incident with this id, ignoring category");
      continue;
    };
    let mut point = point.clone();
    point.category = category.clone();
    store.write_point(&point).await?;
    saved += 1;
  }
  info!(saved, requested = assignments.len(), "saved categories");
  Ok(saved)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::{FeedError, StoreError};
  use crate::store::{AggregateQuery, SeriesRow};
  use alert_engine::types::{LogEntry, LogEntryKind};
  use alert_engine::KeyHeuristics;
  use async_trait::async_trait;
  use chrono::{NaiveDateTime, TimeZone};
  use serde_json::json;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
  }

  fn feed_incident(id: &str, created: i64) -> FeedIncident {
    FeedIncident {
      id: id.into(),
      created_on: at(created),
      description: Some("disk full".into()),
      incident_key: Some(format!("{}-host:check-disk", id)),
      service_name: "Sensu".into(),
    }
  }

  #[derive(Default)]
  struct FakeFeed {
    incidents: Vec<FeedIncident>,
    slow: Option<String>,
    failing: Option<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
  }

  #[async_trait]
  impl IncidentFeed for FakeFeed {
    async fn list_incidents(
      &self,
      _since: DateTime<Utc>,
      _until: Option<DateTime<Utc>>,
    ) -> Result<Vec<FeedIncident>, FeedError> {
      Ok(self.incidents.clone())
    }

    async fn get_log_entries(&self, id: &str) -> Result<Vec<LogEntry>, FeedError> {
      let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
      self.max_in_flight.fetch_max(now, Ordering::SeqCst);
      tokio::time::sleep(Duration::from_millis(10)).await;
      if self.slow.as_deref() == Some(id) {
        tokio::time::sleep(Duration::from_secs(5)).await;
      }
      self.in_flight.fetch_sub(1, Ordering::SeqCst);
      if self.failing.as_deref() == Some(id) {
        return Err(FeedError::Upstream("boom".into()));
      }
      let created = self
        .incidents
        .iter()
        .find(|i| i.id == id)
        .map(|i| i.created_on)
        .unwrap();
      Ok(vec![
        LogEntry { kind: LogEntryKind::Trigger, created_at: created, agent_email: None },
        LogEntry {
          kind: LogEntryKind::Acknowledge,
          created_at: created + chrono::Duration::seconds(60),
          agent_email: Some("oncall@example.com".into()),
        },
        LogEntry {
          kind: LogEntryKind::Resolve,
          created_at: created + chrono::Duration::seconds(90),
          agent_email: None,
        },
      ])
    }

    async fn oncall_emails(
      &self,
      _schedule_id: &str,
      _since: NaiveDateTime,
      _until: NaiveDateTime,
    ) -> Result<Vec<String>, FeedError> {
      Ok(Vec::new())
    }
  }

  #[derive(Default)]
  struct FakeStore {
    rows: Vec<SeriesRow>,
    written: Mutex<Vec<StoredIncident>>,
  }

  #[async_trait]
  impl IncidentStore for FakeStore {
    async fn query_aggregate(&self, _query: &AggregateQuery) -> Result<Vec<SeriesRow>, StoreError> {
      Ok(Vec::new())
    }

    async fn query_points(
      &self,
      _window: &TimeWindow,
      _fields: &[&str],
    ) -> Result<Vec<SeriesRow>, StoreError> {
      Ok(self.rows.clone())
    }

    async fn write_point(&self, incident: &StoredIncident) -> Result<(), StoreError> {
      self.written.lock().unwrap().push(incident.clone());
      Ok(())
    }
  }

  fn row(values: serde_json::Value) -> SeriesRow {
    SeriesRow {
      tags: BTreeMap::new(),
      values: serde_json::from_value(values).unwrap(),
    }
  }

  fn settings(workers: usize, timeout_ms: u64) -> IngestSettings {
    IngestSettings {
      workers,
      request_timeout: Duration::from_millis(timeout_ms),
    }
  }

  #[test]
  fn plan_write_states() {
    assert_eq!(plan_write(None), WriteAction::Insert);
    let open = ExistingPoint { time: 5, resolved: false, category: None };
    assert_eq!(plan_write(Some(&open)), WriteAction::Update { time: 5 });
    let done = ExistingPoint { resolved: true, ..open };
    assert_eq!(plan_write(Some(&done)), WriteAction::Skip);
  }

  #[test]
  fn to_stored_splits_key_and_keeps_unknown_timing() {
    let stored = to_stored(&feed_incident("P1", 0), IncidentTiming::unknown(), &KeyHeuristics);
    assert_eq!(stored.entity.as_deref(), Some("P1-host"));
    assert_eq!(stored.check.as_deref(), Some("check-disk"));
    assert_eq!(stored.input_type, "Sensu");
    assert_eq!(stored.category, DEFAULT_CATEGORY);
    assert!(stored.time_to_ack.is_none());
  }

  #[tokio::test]
  async fn enrich_bounds_concurrency_and_keeps_order() {
    let feed = Arc::new(FakeFeed {
      incidents: (0..12).map(|i| feed_incident(&format!("P{}", i), i)).collect(),
      ..FakeFeed::default()
    });
    let incidents = feed.incidents.clone();
    let timings = enrich(feed.clone(), &incidents, settings(3, 1_000)).await;

    assert_eq!(timings.len(), 12);
    assert!(timings.iter().all(|t| t.as_ref().unwrap().time_to_resolve == Some(90)));
    assert!(feed.max_in_flight.load(Ordering::SeqCst) <= 3);
  }

  #[tokio::test]
  async fn timeout_and_failure_mark_timing_unknown() {
    let feed = Arc::new(FakeFeed {
      incidents: vec![feed_incident("P1", 0), feed_incident("P2", 1), feed_incident("P3", 2)],
      slow: Some("P2".into()),
      failing: Some("P3".into()),
      ..FakeFeed::default()
    });
    let store = FakeStore::default();
    let report = sync(
      feed,
      &store,
      &KeyHeuristics,
      at(0),
      None,
      settings(20, 200),
    )
    .await
    .unwrap();

    assert_eq!(report.fetched, 3);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.timing_unknown, 2);

    let written = store.written.lock().unwrap();
    let p1 = written.iter().find(|i| i.id == "P1").unwrap();
    assert_eq!(p1.time_to_ack, Some(60));
    assert_eq!(p1.acknowledge_by.as_deref(), Some("oncall@example.com"));
    let p2 = written.iter().find(|i| i.id == "P2").unwrap();
    assert!(p2.time_to_ack.is_none() && p2.time_to_resolve.is_none());
  }

  #[tokio::test]
  async fn upsert_inserts_updates_and_skips() {
    let store = FakeStore {
      rows: vec![
        row(json!({"time": 1_699_999_000, "id": "P2", "time_to_resolve": null, "category": "real"})),
        row(json!({"time": 1_700_000_002, "id": "P3", "time_to_resolve": 30})),
      ],
      ..FakeStore::default()
    };
    let points = ["P1", "P2", "P3"]
      .iter()
      .enumerate()
      .map(|(i, id)| to_stored(&feed_incident(id, i as i64), IncidentTiming::unknown(), &KeyHeuristics))
      .collect();

    let report = upsert_incidents(&store, points).await.unwrap();
    assert_eq!((report.inserted, report.updated, report.skipped), (1, 1, 1));

    let written = store.written.lock().unwrap();
    let p2 = written.iter().find(|i| i.id == "P2").unwrap();
    assert_eq!(p2.time, 1_699_999_000);
    assert_eq!(p2.category, "real");
  }

  #[tokio::test]
  async fn empty_batch_touches_nothing() {
    let store = FakeStore::default();
    let report = upsert_incidents(&store, Vec::new()).await.unwrap();
    assert_eq!(report, SyncReport::default());
  }

  #[tokio::test]
  async fn save_categories_rewrites_known_ids() {
    let store = FakeStore {
      rows: vec![row(json!({"time": 1_700_000_000, "id": "P1", "input_type": "Sensu", "category": "not set"}))],
      ..FakeStore::default()
    };
    let window = TimeWindow::around(1_700_000_000, 1_700_000_000);
    let mut assignments = BTreeMap::new();
    assignments.insert("P1".to_string(), "self recovered".to_string());
    assignments.insert("PMISSING".to_string(), "real".to_string());

    let saved = save_categories(&store, &window, &assignments).await.unwrap();
    assert_eq!(saved, 1);
    assert_eq!(store.written.lock().unwrap()[0].category, "self recovered");
  }

  #[tokio::test]
  async fn save_categories_rejects_unknown_category() {
    let store = FakeStore::default();
    let window = TimeWindow::around(0, 1);
    let mut assignments = BTreeMap::new();
    assignments.insert("P1".to_string(), "bogus".to_string());

    let err = save_categories(&store, &window, &assignments).await.unwrap_err();
    assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    assert!(store.written.lock().unwrap().is_empty());
  }
}
