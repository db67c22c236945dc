//! Pigeonhole Alert Engine: deterministic reports over incident history.
//!
//! Recommends alert delay thresholds from per-signature resolve-time percentiles, and
//! shapes alert frequency, noise candidate and response-time reports for the dashboard.
//!
//! No DB, no network; pure computation over rows the caller has already fetched.

pub mod config;
pub mod duration;
pub mod error;
pub mod oncall;
pub mod recommend;
pub mod report;
pub mod series;
pub mod signature;
pub mod timing;
pub mod types;

pub use config::Config;
pub use error::EngineError;
pub use recommend::recommend;
pub use signature::{KeyHeuristics, Signature, SignatureParser};
pub use types::{IncidentAggregateRow, SortBy, ThresholdRecommendation};
