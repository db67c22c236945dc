//! PagerDutyClient against a mocked REST v1 API.

use alert_engine::types::LogEntryKind;
use chrono::{NaiveDate, TimeZone, Utc};
use dashboard::config::PagerDutyConfig;
use dashboard::pagerduty::{IncidentFeed, PagerDutyClient};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> PagerDutyClient {
  PagerDutyClient::new(&PagerDutyConfig {
    api_url: format!("{}/api/v1", server.uri()),
    auth_token: "test-token".into(),
    time_zone: "UTC".into(),
    schedules: Default::default(),
    timeout_secs: 5,
  })
  .unwrap()
}

fn incident(n: usize) -> serde_json::Value {
  json!({
    "id": format!("P{:03}", n),
    "created_on": "2025-01-15T10:00:00Z",
    "incident_key": format!("web-{:02}:check-http", n % 7),
    "service": {"name": "Sensu"},
    "trigger_summary_data": {"description": "HTTP CRITICAL"}
  })
}

#[tokio::test]
async fn incidents_are_paginated_until_a_short_page() {
  let server = MockServer::start().await;
  let full: Vec<_> = (0..100).map(incident).collect();
  let short: Vec<_> = (100..130).map(incident).collect();

  Mock::given(method("GET"))
    .and(path("/api/v1/incidents"))
    .and(query_param("offset", "0"))
    .and(query_param("sort_by", "created_on:desc"))
    .and(query_param("time_zone", "UTC"))
    .and(header("authorization", "Token token=test-token"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"incidents": full})))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/api/v1/incidents"))
    .and(query_param("offset", "100"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"incidents": short})))
    .expect(1)
    .mount(&server)
    .await;

  let since = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
  let incidents = client(&server).list_incidents(since, None).await.unwrap();

  assert_eq!(incidents.len(), 130);
  assert_eq!(incidents[0].id, "P000");
  assert_eq!(incidents[129].id, "P129");
  assert_eq!(incidents[5].service_name, "Sensu");
}

#[tokio::test]
async fn log_entries_carry_agent_email() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/v1/incidents/PABC/log_entries"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "log_entries": [
        {"type": "trigger", "created_at": "2025-01-15T10:00:00Z"},
        {"type": "notify", "created_at": "2025-01-15T10:00:02Z"},
        {"type": "acknowledge", "created_at": "2025-01-15T10:02:00Z",
         "agent": {"email": "oncall@example.com"}}
      ]
    })))
    .mount(&server)
    .await;

  let entries = client(&server).get_log_entries("PABC").await.unwrap();
  assert_eq!(entries.len(), 3);
  assert_eq!(entries[1].kind, LogEntryKind::Other);
  assert_eq!(entries[2].agent_email.as_deref(), Some("oncall@example.com"));
}

#[tokio::test]
async fn oncall_users_for_a_schedule() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/v1/schedules/PSCHED1/users"))
    .and(query_param("since", "2025-01-15T17:00:00Z"))
    .and(query_param("until", "2025-01-16T09:30:00Z"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "users": [{"email": "a@example.com"}, {"name": "no email"}, {"email": "b@example.com"}]
    })))
    .mount(&server)
    .await;

  let day = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
  let emails = client(&server)
    .oncall_emails(
      "PSCHED1",
      day.and_hms_opt(17, 0, 0).unwrap(),
      day.succ_opt().unwrap().and_hms_opt(9, 30, 0).unwrap(),
    )
    .await
    .unwrap();
  assert_eq!(emails, ["a@example.com", "b@example.com"]);
}

#[tokio::test]
async fn upstream_errors_surface() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
    .mount(&server)
    .await;

  let err = client(&server).get_log_entries("PABC").await.unwrap_err();
  assert!(err.to_string().contains("503"), "got {}", err);
}
