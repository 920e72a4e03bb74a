//! Typed views over category payloads.
//!
//! A fact's `value` is free-form JSON whose shape depends on its category.
//! The detector reads only the fields below; every field is optional and a
//! payload that does not fit its view simply yields `None`, which no
//! predicate treats as a conflict.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

// ─── Date parsing ────────────────────────────────────────────────────────────

/// Parse an RFC 3339 timestamp, a `YYYY-MM-DD HH:MM:SS` (or `T`-separated)
/// naive timestamp taken as UTC, or a bare `YYYY-MM-DD` at midnight UTC.
pub fn parse_when(raw: &str) -> Option<DateTime<Utc>> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
      return Some(naive.and_utc());
    }
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
}

/// Map a `high`/`medium`/`low` label to 3/2/1. Anything else has no level.
pub fn level(label: Option<&str>) -> Option<i32> {
  match label?.trim().to_ascii_lowercase().as_str() {
    "high" => Some(3),
    "medium" => Some(2),
    "low" => Some(1),
    _ => None,
  }
}

fn view<T: for<'de> Deserialize<'de>>(value: &Value) -> Option<T> {
  match value {
    Value::Object(_) => serde_json::from_value(value.clone()).ok(),
    _ => None,
  }
}

/// Text carried either as a bare string or under one of `keys`.
fn text_of<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
  match value {
    Value::String(s) => Some(s.as_str()),
    Value::Object(map) => keys.iter().find_map(|k| map.get(*k)?.as_str()),
    _ => None,
  }
}

// ─── Views ───────────────────────────────────────────────────────────────────

/// `{ "date_type": "effective", "date": "2025-04-01" }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateClaim {
  #[serde(alias = "type")]
  pub date_type: Option<String>,
  pub date:      Option<String>,
}

impl DateClaim {
  pub fn from_value(value: &Value) -> Option<Self> { view(value) }

  pub fn when(&self) -> Option<DateTime<Utc>> { parse_when(self.date.as_deref()?) }

  /// The sub-type tag, lower-cased.
  pub fn kind(&self) -> Option<String> {
    self.date_type.as_deref().map(|t| t.trim().to_ascii_lowercase())
  }
}

/// `{ "description": "...", "deadline": "2025-06-30", "priority": "high" }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequirementClaim {
  pub description: Option<String>,
  pub deadline:    Option<String>,
  pub priority:    Option<String>,
}

impl RequirementClaim {
  pub fn from_value(value: &Value) -> Option<Self> { view(value) }

  pub fn deadline(&self) -> Option<DateTime<Utc>> {
    parse_when(self.deadline.as_deref()?)
  }

  pub fn priority_level(&self) -> Option<i32> { level(self.priority.as_deref()) }
}

/// `{ "impact_type": "economic", "description": "...", "severity": "low" }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImpactClaim {
  #[serde(alias = "type")]
  pub impact_type: Option<String>,
  pub description: Option<String>,
  pub severity:    Option<String>,
}

impl ImpactClaim {
  pub fn from_value(value: &Value) -> Option<Self> { view(value) }

  pub fn kind(&self) -> Option<String> {
    self.impact_type.as_deref().map(|t| t.trim().to_ascii_lowercase())
  }

  pub fn severity_level(&self) -> Option<i32> { level(self.severity.as_deref()) }
}

/// A status fact's text: a bare string or `{ "status" | "value" | "description" }`.
pub fn status_text(value: &Value) -> Option<&str> {
  text_of(value, &["status", "value", "description"])
}

/// A guidance fact's text: a bare string or `{ "description" | "text" }`.
pub fn guidance_text(value: &Value) -> Option<&str> {
  text_of(value, &["description", "text"])
}
