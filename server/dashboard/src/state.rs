use alert_engine::{KeyHeuristics, SignatureParser};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::ingest::IngestSettings;
use crate::pagerduty::IncidentFeed;
use crate::store::IncidentStore;

pub type Parser = dyn SignatureParser + Send + Sync;

pub struct AppState {
  pub store: Arc<dyn IncidentStore>,
  pub feed: Arc<dyn IncidentFeed>,
  pub parser: Arc<Parser>,
  pub report: alert_engine::Config,
  pub ingest: IngestSettings,
  /// Schedule display name -> schedule id.
  pub schedules: BTreeMap<String, String>,
}

impl AppState {
  pub fn new(
    store: Arc<dyn IncidentStore>,
    feed: Arc<dyn IncidentFeed>,
    config: &AppConfig,
  ) -> Self {
    Self {
      store,
      feed,
      parser: Arc::new(KeyHeuristics),
      report: config.report.clone(),
      ingest: IngestSettings::from(&config.ingest),
      schedules: config.pagerduty.schedules.clone(),
    }
  }
}
