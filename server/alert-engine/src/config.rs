//! Report tunables with sane defaults.

use serde::Deserialize;

/// Tunables for report shaping. Threshold recommendation takes its inputs explicitly.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Hostname suffix stripped from entity names in chart series (e.g. ".example.net").
  pub strip_domain_suffix: Option<String>,
  /// Incidents resolved faster than this many seconds are noise candidates.
  pub noise_max_resolve_secs: u64,
  /// Max series emitted for a chart.
  pub max_series: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      strip_domain_suffix: None,
      noise_max_resolve_secs: 120,
      max_series: 50,
    }
  }
}
