//! Binary entrypoint: read one recommendation request from stdin, write JSON to stdout.
//!
//! Input is a RecommendInput object. Output is either the array of recommendations or an
//! ErrorOutput (exit status 1).

use alert_engine::types::{ErrorOutput, RecommendInput};
use alert_engine::{recommend, EngineError, SortBy, ThresholdRecommendation};
use serde::Serialize;
use std::io::{self, Read, Write};

fn main() {
  match run() {
    Ok(recs) => {
      if let Err(e) = write_json(io::stdout().lock(), &recs) {
        eprintln!("alert-engine: writing output: {}", e);
        std::process::exit(1);
      }
    }
    Err(e) => {
      let err = match &e {
        EngineError::InvalidArgument { field, reason } => {
          ErrorOutput::new(reason.clone()).with_field(field.clone())
        }
        _ => ErrorOutput::new(e.to_string()),
      };
      if let Err(e) = write_json(io::stdout().lock(), &err) {
        eprintln!("alert-engine: writing output: {}", e);
      }
      std::process::exit(1);
    }
  }
}

/// One JSON document and a trailing newline, flushed.
fn write_json<W: Write, T: Serialize>(mut out: W, value: &T) -> io::Result<()> {
  serde_json::to_writer(&mut out, value)?;
  writeln!(out)?;
  out.flush()
}

fn run() -> Result<Vec<ThresholdRecommendation>, EngineError> {
  let mut raw = String::new();
  io::stdin()
    .lock()
    .read_to_string(&mut raw)
    .map_err(|e| EngineError::invalid("stdin", &e.to_string()))?;
  let input: RecommendInput = serde_json::from_str(&raw)?;
  let sort_by: SortBy = input.sort_by.parse()?;

  recommend(
    &input.rows,
    input.percentage,
    input.more_than,
    &input.recover_within,
    sort_by,
  )
}
