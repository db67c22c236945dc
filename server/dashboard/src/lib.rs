//! Pigeonhole Dashboard
//!
//! JSON API over the incident history: syncs incidents from PagerDuty into InfluxDB and serves
//! frequency, noise, response-time and threshold reports built by the alert engine.
//! Binds to 127.0.0.1 by default (internal only).

pub mod config;
pub mod date;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod influx;
pub mod ingest;
pub mod line_protocol;
pub mod pagerduty;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod types;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use error::DashboardError;
pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(handlers::health))
    .route("/api/incidents/:date", get(handlers::day_incidents))
    .route(
      "/api/incidents/:date/categories",
      post(handlers::save_day_categories),
    )
    .route("/api/breakdown/:start/:end", get(handlers::breakdown))
    .route("/api/noise/:start/:end", get(handlers::noise))
    .route("/api/response/:start/:end", get(handlers::response))
    .route("/api/thresholds", get(handlers::thresholds))
    .route("/api/oncall", get(handlers::oncall))
    .route("/api/sync", post(handlers::sync))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    .with_state(state)
}
