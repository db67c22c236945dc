//! Structured error types for the alert engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("invalid argument: {field}: {reason}")]
  InvalidArgument { field: String, reason: String },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn invalid(field: &str, reason: &str) -> Self {
    Self::InvalidArgument {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }
}
