//! Severity classification for newly detected conflicts.

use serde_json::Value;

use crate::{
  conflict::Severity,
  taxonomy::FactCategory,
  value::{DateClaim, status_text},
};

/// Date sub-types whose disagreement is always urgent.
const CRITICAL_DATE_TYPES: &[&str] = &["deadline", "effective"];

/// Status keywords whose presence makes a disagreement urgent.
const CRITICAL_STATUS_WORDS: &[&str] = &["revoked", "stayed"];

/// Classify a conflict between two values of `category`.
///
/// Pure: the result depends only on the arguments.
pub fn classify(category: &FactCategory, a: &Value, b: &Value) -> Severity {
  match category {
    FactCategory::Date => {
      let critical = |v: &Value| {
        DateClaim::from_value(v)
          .and_then(|c| c.kind())
          .is_some_and(|k| CRITICAL_DATE_TYPES.contains(&k.as_str()))
      };
      if critical(a) || critical(b) { Severity::High } else { Severity::Medium }
    }
    FactCategory::Requirement => Severity::High,
    FactCategory::Status => {
      let critical = |v: &Value| {
        status_text(v).is_some_and(|t| {
          let t = t.to_lowercase();
          CRITICAL_STATUS_WORDS.iter().any(|w| t.contains(w))
        })
      };
      if critical(a) || critical(b) { Severity::High } else { Severity::Medium }
    }
    FactCategory::Impact | FactCategory::Guidance => Severity::Medium,
    _ => Severity::Medium,
  }
}
