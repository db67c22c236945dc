//! Binary entrypoint for the dashboard API.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use dashboard::influx::InfluxStore;
use dashboard::pagerduty::PagerDutyClient;
use dashboard::{router, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dashboard::telemetry::init_tracing("info");

  let path = AppConfig::default_path();
  let config = AppConfig::load(&path)?;

  let store = InfluxStore::new(&config.influxdb).context("influxdb client")?;
  if !store.can_write() {
    info!("no read-write influxdb user configured; sync and categories are disabled");
  }
  let feed = PagerDutyClient::new(&config.pagerduty).context("pagerduty client")?;
  let state = Arc::new(AppState::new(Arc::new(store), Arc::new(feed), &config));

  let app = router(state);
  let addr = config.server.bind;
  info!(%addr, config = %path.display(), "dashboard listening");

  let listener = tokio::net::TcpListener::bind(addr)
    .await
    .with_context(|| format!("bind {}", addr))?;
  axum::serve(listener, app).await?;

  Ok(())
}
