//! Acknowledge/resolve timing derived from an incident's log entries.

use chrono::{DateTime, Utc};

use crate::types::{IncidentTiming, LogEntry, LogEntryKind};

/// Derive timing from log entries (any order).
///
/// The trigger time is the earliest `trigger` entry, falling back to `created_on`. The first
/// acknowledgement supplies `acknowledge_by`. Durations are whole seconds, never negative.
pub fn derive_timing(created_on: DateTime<Utc>, entries: &[LogEntry]) -> IncidentTiming {
  let first = |kind: LogEntryKind| {
    entries
      .iter()
      .filter(|e| e.kind == kind)
      .min_by_key(|e| e.created_at)
  };

  let triggered_at = first(LogEntryKind::Trigger)
    .map(|e| e.created_at)
    .unwrap_or(created_on);
  let since_trigger = |e: &LogEntry| (e.created_at - triggered_at).num_seconds().max(0);

  let ack = first(LogEntryKind::Acknowledge);
  IncidentTiming {
    acknowledge_by: ack.and_then(|e| e.agent_email.clone()),
    time_to_ack: ack.map(since_trigger),
    time_to_resolve: first(LogEntryKind::Resolve).map(since_trigger),
  }
}
