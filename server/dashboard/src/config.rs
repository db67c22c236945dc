//! Configuration: `config.toml` overlaid with `PIGEONHOLE_*` environment variables.
//!
//! Env keys use `__` between section and key, e.g. `PIGEONHOLE_INFLUXDB__HOST`.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::DashboardError;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "PIGEONHOLE_CONFIG";
const ENV_PREFIX: &str = "PIGEONHOLE_";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  pub influxdb: InfluxConfig,
  pub pagerduty: PagerDutyConfig,
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub ingest: IngestConfig,
  #[serde(default)]
  pub report: alert_engine::Config,
}

/// InfluxDB 1.x HTTP API. Writes need the read-write user.
#[derive(Debug, Clone, Deserialize)]
pub struct InfluxConfig {
  #[serde(default = "default_influx_scheme")]
  pub scheme: String,
  pub host: String,
  #[serde(default = "default_influx_port")]
  pub port: u16,
  pub database: String,
  #[serde(default = "default_series")]
  pub series: String,
  pub username: Option<String>,
  pub password: Option<String>,
  pub username_rw: Option<String>,
  pub password_rw: Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl InfluxConfig {
  pub fn base_url(&self) -> String {
    format!("{}://{}:{}", self.scheme, self.host, self.port)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagerDutyConfig {
  pub api_url: String,
  pub auth_token: String,
  #[serde(default = "default_time_zone")]
  pub time_zone: String,
  /// Schedule display name -> schedule id.
  #[serde(default)]
  pub schedules: BTreeMap<String, String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub bind: SocketAddr,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: SocketAddr::from(([127, 0, 0, 1], 5004)),
    }
  }
}

/// Ingestion fan-out limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
  /// Concurrent per-incident detail lookups.
  pub workers: usize,
  pub request_timeout_secs: u64,
}

impl Default for IngestConfig {
  fn default() -> Self {
    Self {
      workers: 20,
      request_timeout_secs: 10,
    }
  }
}

impl IngestConfig {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

fn default_influx_scheme() -> String {
  "http".into()
}

fn default_influx_port() -> u16 {
  8086
}

fn default_series() -> String {
  "incidents".into()
}

fn default_time_zone() -> String {
  "UTC".into()
}

fn default_timeout_secs() -> u64 {
  10
}

impl AppConfig {
  /// Config file path: `$PIGEONHOLE_CONFIG`, else `config.toml`.
  pub fn default_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
  }

  pub fn figment(path: &Path) -> Figment {
    Figment::new()
      .merge(Toml::file(path))
      .merge(Env::prefixed(ENV_PREFIX).split("__"))
  }

  pub fn load(path: &Path) -> Result<Self, DashboardError> {
    Self::from_figment(Self::figment(path)).map_err(|e| {
      DashboardError::Config(format!(
        "could not load configuration from {}: {}",
        path.display(),
        e
      ))
    })
  }

  pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
    figment.extract()
  }
}
