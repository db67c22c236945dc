//! PagerDuty REST v1 client: incidents, their log entries, and schedule users.

use alert_engine::types::{LogEntry, LogEntryKind};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::PagerDutyConfig;
use crate::error::FeedError;

const PAGE_LIMIT: usize = 100;
const TOKEN_PREFIX: &str = "Token token=";

/// An incident as listed by the paging service, before timing enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedIncident {
  pub id: String,
  pub created_on: DateTime<Utc>,
  pub description: Option<String>,
  pub incident_key: Option<String>,
  pub service_name: String,
}

#[async_trait]
pub trait IncidentFeed: Send + Sync {
  /// Incidents created in `[since, until)`, newest first.
  async fn list_incidents(
    &self,
    since: DateTime<Utc>,
    until: Option<DateTime<Utc>>,
  ) -> Result<Vec<FeedIncident>, FeedError>;

  async fn get_log_entries(&self, incident_id: &str) -> Result<Vec<LogEntry>, FeedError>;

  /// Emails of users on call for a schedule in the window.
  async fn oncall_emails(
    &self,
    schedule_id: &str,
    since: NaiveDateTime,
    until: NaiveDateTime,
  ) -> Result<Vec<String>, FeedError>;
}

#[derive(Debug, Clone)]
pub struct PagerDutyClient {
  client: reqwest::Client,
  api_url: String,
  time_zone: String,
}

impl PagerDutyClient {
  pub fn new(config: &PagerDutyConfig) -> Result<Self, FeedError> {
    let token = if config.auth_token.starts_with(TOKEN_PREFIX) {
      config.auth_token.clone()
    } else {
      format!("{}{}", TOKEN_PREFIX, config.auth_token)
    };
    let mut auth = HeaderValue::from_str(&token)
      .map_err(|e| FeedError::Upstream(format!("invalid auth token: {}", e)))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .default_headers(headers)
      .build()
      .map_err(|e| FeedError::Upstream(format!("failed to create HTTP client: {}", e)))?;

    let mut api_url = config.api_url.clone();
    if !api_url.ends_with('/') {
      api_url.push('/');
    }

    Ok(Self {
      client,
      api_url,
      time_zone: config.time_zone.clone(),
    })
  }

  async fn get<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    query: &[(&str, String)],
  ) -> Result<T, FeedError> {
    let url = format!("{}{}", self.api_url, endpoint);
    debug!(url = %url, "pagerduty request");

    let response = self
      .client
      .get(&url)
      .query(query)
      .send()
      .await
      .map_err(|e| FeedError::Upstream(format!("request to {} failed: {}", endpoint, e)))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(FeedError::Upstream(format!(
        "{} returned {}: {}",
        endpoint,
        status,
        body.trim()
      )));
    }

    response
      .json()
      .await
      .map_err(|e| FeedError::Decode(format!("failed to parse {} response: {}", endpoint, e)))
  }
}

fn timestamp(at: DateTime<Utc>) -> String {
  at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Deserialize)]
struct IncidentsPage {
  #[serde(default)]
  incidents: Vec<RawIncident>,
}

#[derive(Debug, Deserialize)]
struct RawIncident {
  id: String,
  created_on: DateTime<Utc>,
  incident_key: Option<String>,
  #[serde(default)]
  service: RawService,
  #[serde(default)]
  trigger_summary_data: TriggerSummary,
}

#[derive(Debug, Default, Deserialize)]
struct RawService {
  #[serde(default)]
  name: String,
}

#[derive(Debug, Default, Deserialize)]
struct TriggerSummary {
  description: Option<String>,
  subject: Option<String>,
}

impl From<RawIncident> for FeedIncident {
  fn from(raw: RawIncident) -> Self {
    // Some integrations send no description; fall back on service name and subject.
    let description = raw.trigger_summary_data.description.or_else(|| {
      Some(format!(
        "{}: {}",
        raw.service.name,
        raw.trigger_summary_data.subject.unwrap_or_default()
      ))
    });
    FeedIncident {
      id: raw.id,
      created_on: raw.created_on,
      description,
      incident_key: raw.incident_key.filter(|k| !k.is_empty()),
      service_name: raw.service.name,
    }
  }
}

#[derive(Debug, Deserialize)]
struct LogEntriesPage {
  #[serde(default)]
  log_entries: Vec<RawLogEntry>,
}

#[derive(Debug, Deserialize)]
struct RawLogEntry {
  #[serde(rename = "type")]
  kind: LogEntryKind,
  created_at: DateTime<Utc>,
  agent: Option<RawAgent>,
}

#[derive(Debug, Deserialize)]
struct RawAgent {
  email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersPage {
  #[serde(default)]
  users: Vec<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
  email: Option<String>,
}

#[async_trait]
impl IncidentFeed for PagerDutyClient {
  async fn list_incidents(
    &self,
    since: DateTime<Utc>,
    until: Option<DateTime<Utc>>,
  ) -> Result<Vec<FeedIncident>, FeedError> {
    let mut incidents = Vec::new();
    let mut offset = 0;
    loop {
      let mut query = vec![("since", timestamp(since))];
      if let Some(until) = until {
        query.push(("until", timestamp(until)));
      }
      query.push(("time_zone", self.time_zone.clone()));
      query.push(("sort_by", "created_on:desc".to_string()));
      query.push(("offset", offset.to_string()));
      query.push(("limit", PAGE_LIMIT.to_string()));

      let page: IncidentsPage = self.get("incidents", &query).await?;
      let received = page.incidents.len();
      debug!(offset, received, "received incident page");
      incidents.extend(page.incidents.into_iter().map(FeedIncident::from));

      if received < PAGE_LIMIT {
        break;
      }
      offset += PAGE_LIMIT;
    }
    Ok(incidents)
  }

  async fn get_log_entries(&self, incident_id: &str) -> Result<Vec<LogEntry>, FeedError> {
    let endpoint = format!("incidents/{}/log_entries", incident_id);
    let page: LogEntriesPage = self.get(&endpoint, &[]).await?;
    Ok(
      page
        .log_entries
        .into_iter()
        .map(|raw| LogEntry {
          kind: raw.kind,
          created_at: raw.created_at,
          agent_email: raw.agent.and_then(|a| a.email),
        })
        .collect(),
    )
  }

  async fn oncall_emails(
    &self,
    schedule_id: &str,
    since: NaiveDateTime,
    until: NaiveDateTime,
  ) -> Result<Vec<String>, FeedError> {
    let endpoint = format!("schedules/{}/users", schedule_id);
    let query = [
      ("since", timestamp(since.and_utc())),
      ("until", timestamp(until.and_utc())),
    ];
    let page: UsersPage = self.get(&endpoint, &query).await?;
    Ok(page.users.into_iter().filter_map(|u| u.email).collect())
  }
}
