//! Error types for the storage/paging adapters and the HTTP surface.

use alert_engine::EngineError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("no read-write user defined, cannot write points")]
  ReadOnly,

  #[error("influxdb: {0}")]
  Upstream(String),

  #[error("influxdb response: {0}")]
  Decode(String),
}

#[derive(Debug, Error)]
pub enum FeedError {
  #[error("pagerduty: {0}")]
  Upstream(String),

  #[error("pagerduty response: {0}")]
  Decode(String),
}

#[derive(Debug, Error)]
pub enum DashboardError {
  #[error(transparent)]
  Engine(#[from] EngineError),

  #[error("invalid argument: {field}: {reason}")]
  InvalidArgument { field: String, reason: String },

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Feed(#[from] FeedError),

  #[error("config: {0}")]
  Config(String),
}

impl DashboardError {
  pub fn invalid(field: &str, reason: &str) -> Self {
    Self::InvalidArgument {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Engine(_) | Self::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
      Self::Store(_) | Self::Feed(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for DashboardError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    } else {
      tracing::warn!(error = %self, "rejected request");
    }
    let body = serde_json::json!({
      "error": true,
      "message": self.to_string(),
    });
    (status, Json(body)).into_response()
  }
}
