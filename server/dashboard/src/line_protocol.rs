//! InfluxDB line protocol for incident points.

use alert_engine::types::StoredIncident;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Integer(i64),
  Text(String),
}

impl fmt::Display for FieldValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FieldValue::Integer(v) => write!(f, "{}i", v),
      FieldValue::Text(v) => write!(f, "\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")),
    }
  }
}

impl From<i64> for FieldValue {
  fn from(value: i64) -> Self {
    FieldValue::Integer(value)
  }
}

impl From<&str> for FieldValue {
  fn from(value: &str) -> Self {
    FieldValue::Text(value.to_string())
  }
}

impl From<String> for FieldValue {
  fn from(value: String) -> Self {
    FieldValue::Text(value)
  }
}

#[derive(Debug)]
pub struct LineBuilder {
  measurement: String,
  tags: Vec<(String, String)>,
  fields: Vec<(String, FieldValue)>,
  timestamp: Option<i64>,
}

impl LineBuilder {
  pub fn new(measurement: impl Into<String>) -> Self {
    Self {
      measurement: measurement.into(),
      tags: Vec::new(),
      fields: Vec::new(),
      timestamp: None,
    }
  }

  /// Empty tag values are not representable and are skipped.
  #[must_use]
  pub fn tag(mut self, key: &str, value: &str) -> Self {
    if !value.is_empty() {
      self.tags.push((key.to_string(), value.to_string()));
    }
    self
  }

  #[must_use]
  pub fn field(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
    self.fields.push((key.to_string(), value.into()));
    self
  }

  #[must_use]
  pub fn field_opt<V: Into<FieldValue>>(self, key: &str, value: Option<V>) -> Self {
    match value {
      Some(v) => self.field(key, v),
      None => self,
    }
  }

  /// Epoch seconds; writes use `precision=s`.
  #[must_use]
  pub fn timestamp(mut self, secs: i64) -> Self {
    self.timestamp = Some(secs);
    self
  }

  pub fn build(self) -> String {
    let mut line = escape_measurement(&self.measurement);
    for (key, value) in &self.tags {
      line.push(',');
      line.push_str(&escape_key(key));
      line.push('=');
      line.push_str(&escape_key(value));
    }
    let fields: Vec<String> = self
      .fields
      .iter()
      .map(|(key, value)| format!("{}={}", escape_key(key), value))
      .collect();
    line.push(' ');
    line.push_str(&fields.join(","));
    if let Some(ts) = self.timestamp {
      line.push(' ');
      line.push_str(&ts.to_string());
    }
    line
  }
}

fn escape_measurement(s: &str) -> String {
  s.replace(',', "\\,").replace(' ', "\\ ")
}

// Tag keys, tag values and field keys share the same rules.
fn escape_key(s: &str) -> String {
  s.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

/// One incident as a point: signature parts are tags, the rest fields.
pub fn incident_line(series: &str, incident: &StoredIncident) -> String {
  LineBuilder::new(series)
    .tag("incident_key", incident.incident_key.as_deref().unwrap_or(""))
    .tag("input_type", &incident.input_type)
    .field("id", incident.id.as_str())
    .field("category", incident.category.as_str())
    .field_opt("description", incident.description.as_deref())
    .field_opt("entity", incident.entity.as_deref())
    .field_opt("check", incident.check.as_deref())
    .field_opt("acknowledge_by", incident.acknowledge_by.as_deref())
    .field_opt("time_to_ack", incident.time_to_ack)
    .field_opt("time_to_resolve", incident.time_to_resolve)
    .timestamp(incident.time)
    .build()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn escapes_tags_and_strings() {
    let line = LineBuilder::new("my series")
      .tag("incident_key", "web 01,disk=full")
      .tag("empty", "")
      .field("description", "say \"hi\" \\o/")
      .field("count", 3)
      .timestamp(1_700_000_000)
      .build();
    assert_eq!(
      line,
      r#"my\ series,incident_key=web\ 01\,disk\=full description="say \"hi\" \\o/",count=3i 1700000000"#
    );
  }

  #[test]
  fn incident_line_skips_unknown_fields() {
    let incident = StoredIncident {
      id: "PABC".into(),
      time: 1_700_000_000,
      incident_key: None,
      input_type: "Nagios".into(),
      description: None,
      category: "not set".into(),
      entity: None,
      check: None,
      acknowledge_by: None,
      time_to_ack: Some(30),
      time_to_resolve: None,
    };
    assert_eq!(
      incident_line("incidents", &incident),
      r#"incidents,input_type=Nagios id="PABC",category="not set",time_to_ack=30i 1700000000"#
    );
  }
}
