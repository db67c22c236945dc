//! InfluxDB 1.x adapter over the HTTP API (`/query`, `/write`).

use alert_engine::types::StoredIncident;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::InfluxConfig;
use crate::date::TimeWindow;
use crate::error::StoreError;
use crate::line_protocol::incident_line;
use crate::store::{Aggregate, AggregateQuery, GroupBy, IncidentStore, SeriesRow};

#[derive(Debug, Clone)]
struct Credentials {
  username: String,
  password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InfluxStore {
  client: reqwest::Client,
  base_url: String,
  database: String,
  series: String,
  read: Option<Credentials>,
  write: Option<Credentials>,
}

impl InfluxStore {
  pub fn new(config: &InfluxConfig) -> Result<Self, StoreError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| StoreError::Upstream(format!("failed to create HTTP client: {}", e)))?;

    let read = config.username.clone().map(|username| Credentials {
      username,
      password: config.password.clone(),
    });
    let write = match (&config.username_rw, &config.password_rw) {
      (Some(username), Some(password)) => Some(Credentials {
        username: username.clone(),
        password: Some(password.clone()),
      }),
      _ => None,
    };

    Ok(Self {
      client,
      base_url: config.base_url().trim_end_matches('/').to_string(),
      database: config.database.clone(),
      series: config.series.clone(),
      read,
      write,
    })
  }

  pub fn can_write(&self) -> bool {
    self.write.is_some()
  }

  async fn query(&self, q: &str) -> Result<Vec<SeriesRow>, StoreError> {
    let url = format!("{}/query", self.base_url);
    debug!(query = %q, "influx query");

    let mut request = self
      .client
      .get(&url)
      .query(&[("db", self.database.as_str()), ("q", q), ("epoch", "s")]);
    if let Some(creds) = &self.read {
      request = request.basic_auth(&creds.username, creds.password.as_ref());
    }

    let response = request
      .send()
      .await
      .map_err(|e| StoreError::Upstream(format!("query failed: {}", e)))?;
    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| StoreError::Upstream(format!("failed to read response body: {}", e)))?;

    if !status.is_success() {
      // Influx reports query errors as JSON with a non-2xx status.
      if let Ok(parsed) = serde_json::from_str::<QueryResponse>(&body) {
        if let Some(error) = parsed.error {
          return missing_series_or(error);
        }
      }
      return Err(StoreError::Upstream(format!("query returned {}: {}", status, body.trim())));
    }

    let parsed: QueryResponse = serde_json::from_str(&body)
      .map_err(|e| StoreError::Decode(format!("failed to parse query response: {}", e)))?;
    parsed.into_rows()
  }
}

fn missing_series_or(error: String) -> Result<Vec<SeriesRow>, StoreError> {
  if is_missing_series(&error) {
    warn!(error = %error, "series not found, treating as empty");
    Ok(Vec::new())
  } else {
    Err(StoreError::Upstream(error))
  }
}

fn is_missing_series(message: &str) -> bool {
  let lower = message.to_ascii_lowercase();
  lower.contains("couldn't find series") || lower.contains("series not found")
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
  #[serde(default)]
  results: Vec<StatementResult>,
  error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
  #[serde(default)]
  series: Vec<RawSeries>,
  error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSeries {
  #[serde(default)]
  tags: BTreeMap<String, String>,
  #[serde(default)]
  columns: Vec<String>,
  #[serde(default)]
  values: Vec<Vec<Value>>,
}

impl QueryResponse {
  fn into_rows(self) -> Result<Vec<SeriesRow>, StoreError> {
    if let Some(error) = self.error {
      return missing_series_or(error);
    }
    let mut rows = Vec::new();
    for result in self.results {
      if let Some(error) = result.error {
        if is_missing_series(&error) {
          continue;
        }
        return Err(StoreError::Upstream(error));
      }
      for series in result.series {
        for values in series.values {
          rows.push(SeriesRow {
            tags: series.tags.clone(),
            values: series.columns.iter().cloned().zip(values).collect(),
          });
        }
      }
    }
    Ok(rows)
  }
}

fn quote_ident(name: &str) -> String {
  format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

fn time_range(window: &TimeWindow) -> String {
  format!(
    "time > {}s AND time < {}s",
    window.start_secs(),
    window.end_secs()
  )
}

/// Render a grouped aggregate as InfluxQL.
pub fn render_aggregate(series: &str, query: &AggregateQuery) -> String {
  let columns: Vec<String> = query
    .metrics
    .iter()
    .map(|m| {
      let field = quote_ident(m.field);
      let call = match m.func {
        Aggregate::Count => format!("COUNT({})", field),
        Aggregate::Percentile(p) => format!("PERCENTILE({}, {})", field, p),
        Aggregate::Max => format!("MAX({})", field),
        Aggregate::Mean => format!("MEAN({})", field),
      };
      format!("{} AS {}", call, quote_ident(m.alias))
    })
    .collect();

  let mut q = format!(
    "SELECT {} FROM {} WHERE {}",
    columns.join(", "),
    quote_ident(series),
    time_range(&query.window)
  );
  if let Some(condition) = &query.condition {
    q.push_str(&format!(" AND {} < {}", quote_ident(condition.field), condition.less_than));
  }
  if !query.group_by.is_empty() {
    let groups: Vec<String> = query
      .group_by
      .iter()
      .map(|g| match g {
        GroupBy::Tag(tag) => quote_ident(tag),
        GroupBy::Time(granularity) => format!("time({})", granularity.as_str()),
      })
      .collect();
    q.push_str(" GROUP BY ");
    q.push_str(&groups.join(", "));
  }
  if query.fill_zero {
    q.push_str(" fill(0)");
  }
  q
}

pub fn render_points(series: &str, window: &TimeWindow, fields: &[&str]) -> String {
  let select = if fields.is_empty() {
    "*".to_string()
  } else {
    fields.iter().map(|f| quote_ident(f)).collect::<Vec<_>>().join(", ")
  };
  format!(
    "SELECT {} FROM {} WHERE {}",
    select,
    quote_ident(series),
    time_range(window)
  )
}

#[async_trait]
impl IncidentStore for InfluxStore {
  async fn query_aggregate(&self, query: &AggregateQuery) -> Result<Vec<SeriesRow>, StoreError> {
    self.query(&render_aggregate(&self.series, query)).await
  }

  async fn query_points(
    &self,
    window: &TimeWindow,
    fields: &[&str],
  ) -> Result<Vec<SeriesRow>, StoreError> {
    self.query(&render_points(&self.series, window, fields)).await
  }

  async fn write_point(&self, incident: &StoredIncident) -> Result<(), StoreError> {
    let creds = self.write.as_ref().ok_or(StoreError::ReadOnly)?;
    let line = incident_line(&self.series, incident);
    debug!(id = %incident.id, time = incident.time, "influx write");

    let response = self
      .client
      .post(format!("{}/write", self.base_url))
      .query(&[("db", self.database.as_str()), ("precision", "s")])
      .basic_auth(&creds.username, creds.password.as_ref())
      .body(line)
      .send()
      .await
      .map_err(|e| StoreError::Upstream(format!("write failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(StoreError::Upstream(format!("write returned {}: {}", status, body.trim())));
    }
    Ok(())
  }
}
