//! Chart series for the dashboard (Highcharts-shaped JSON, no rendering).

use crate::config::Config;
use crate::types::{
  AlertResponse, ChartSeries, FrequencyEntry, ResponseIncident, SeriesData, SeriesPoint, Tooltip,
};

/// One series per signature with a single count value, capped at `config.max_series`.
pub fn frequency_series(entries: &[FrequencyEntry], config: &Config) -> Vec<ChartSeries> {
  entries
    .iter()
    .take(config.max_series)
    .map(|e| {
      let mut name = match config.strip_domain_suffix.as_deref() {
        Some(suffix) if !suffix.is_empty() => e.entity.strip_suffix(suffix).unwrap_or(&e.entity),
        _ => &e.entity,
      }
      .to_string();
      if let Some(check) = &e.check {
        name.push(':');
        name.push_str(short_check(check));
      }
      ChartSeries::new(name, SeriesData::Values(vec![e.count]))
    })
    .collect()
}

/// Drop a long dashed tail: "check-disk-usage" -> "check"; "check-disk" is kept.
fn short_check(check: &str) -> &str {
  let Some(first) = check.find('-') else {
    return check;
  };
  // Needs a second dash with at least one char on each side.
  let rest = &check[first + 1..];
  let has_tail = rest
    .char_indices()
    .any(|(i, c)| c == '-' && i > 0 && i + 1 < rest.len());
  if has_tail {
    &check[..first]
  } else {
    check
  }
}

/// Count, ack and resolve series for the alert response chart.
pub fn response_series(report: &AlertResponse) -> Vec<ChartSeries> {
  let mut count_data: Vec<(i64, i64)> = report
    .count
    .iter()
    .map(|c| (c.time * 1000, c.count as i64))
    .collect();
  count_data.sort();

  let (ack_name, resolve_name, ack_data, resolve_data) = match &report.aggregated {
    Some(means) => {
      let mut ack: Vec<(i64, i64)> = means.iter().map(|m| (m.time * 1000, m.mean_ack)).collect();
      let mut resolve: Vec<(i64, i64)> =
        means.iter().map(|m| (m.time * 1000, m.mean_resolve)).collect();
      ack.sort();
      resolve.sort();
      (
        "Average time until acknowledgement of alert",
        "Average time until alert was resolved",
        SeriesData::Pairs(ack),
        SeriesData::Pairs(resolve),
      )
    }
    None => (
      "Time until acknowledgement of alert",
      "Time until alert was resolved",
      SeriesData::Points(incident_points(&report.incidents, |i| i.time_to_ack)),
      SeriesData::Points(incident_points(&report.incidents, |i| i.time_to_resolve)),
    ),
  };

  let minutes_axis = |name: &str, data: SeriesData| ChartSeries {
    y_axis: Some(1),
    tooltip: Some(Tooltip {
      value_suffix: "min".into(),
    }),
    ..ChartSeries::new(name, data)
  };

  vec![
    ChartSeries {
      dash_style: Some("shortdot".into()),
      ..ChartSeries::new(
        format!("Number of alerts per {}", report.count_group_by),
        SeriesData::Pairs(count_data),
      )
    },
    minutes_axis(ack_name, ack_data),
    minutes_axis(resolve_name, resolve_data),
  ]
}

fn incident_points(
  incidents: &[ResponseIncident],
  minutes: fn(&ResponseIncident) -> i64,
) -> Vec<SeriesPoint> {
  let mut points: Vec<SeriesPoint> = incidents
    .iter()
    .map(|i| SeriesPoint {
      name: i.incident_key.clone(),
      x: i.alert_time * 1000,
      y: minutes(i),
    })
    .collect();
  points.sort_by_key(|p| p.x);
  points
}
