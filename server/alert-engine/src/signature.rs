//! Split an incident key into the entity that alerted and the check that fired.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
  pub entity: String,
  pub check: Option<String>,
}

/// Maps an incident key (plus the integration it came from) to entity/check fields.
pub trait SignatureParser {
  fn parse(&self, incident_key: &str, input_type: &str) -> Signature;
}

impl<F> SignatureParser for F
where
  F: Fn(&str, &str) -> Signature,
{
  fn parse(&self, incident_key: &str, input_type: &str) -> Signature {
    self(incident_key, input_type)
  }
}

/// Default heuristics for the common monitoring integrations.
///
/// - `entity:check` for any input type
/// - `entity/check` for Sensu
/// - `entity words... check` for Nagios (check is the last word)
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyHeuristics;

impl SignatureParser for KeyHeuristics {
  fn parse(&self, incident_key: &str, input_type: &str) -> Signature {
    if let Some((entity, check)) = incident_key.split_once(':') {
      return signature(entity, Some(check));
    }

    let input_type = input_type.to_ascii_lowercase();
    if input_type.contains("sensu") {
      if let Some((entity, check)) = incident_key.split_once('/') {
        let check = check.split('/').next().unwrap_or(check);
        return signature(entity, Some(check));
      }
    } else if input_type.contains("nagios") {
      if let Some((entity, check)) = incident_key.trim().rsplit_once(' ') {
        return signature(entity, Some(check));
      }
    }

    signature(incident_key, None)
  }
}

fn signature(entity: &str, check: Option<&str>) -> Signature {
  Signature {
    entity: entity.trim().to_string(),
    check: check.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string),
  }
}
