//! Per-category conflict predicates.
//!
//! Each predicate decides whether two facts of the same category genuinely
//! disagree. Categories without a predicate (entity, definition, exemption,
//! authority, amendment, and anything unrecognised) never conflict; adding a
//! predicate for one of them is a matter of extending [`facts_conflict`].

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::{
  config::DetectionThresholds,
  similarity::{jaccard, word_set},
  taxonomy::FactCategory,
  value::{DateClaim, ImpactClaim, RequirementClaim, guidance_text, status_text},
};

/// Status keywords that are mutually exclusive in meaning.
pub const OPPOSED_STATUS_KEYWORDS: &[&str] = &[
  "active",
  "inactive",
  "revoked",
  "stayed",
  "implemented",
  "superseded",
  "upheld",
  "blocked",
  "expired",
];

/// Whether two values of `category` disagree under `thresholds`.
pub fn facts_conflict(
  category: &FactCategory,
  a: &Value,
  b: &Value,
  thresholds: &DetectionThresholds,
) -> bool {
  match category {
    FactCategory::Date => dates_conflict(a, b, thresholds),
    FactCategory::Requirement => requirements_conflict(a, b, thresholds),
    FactCategory::Impact => impacts_conflict(a, b, thresholds),
    FactCategory::Status => statuses_conflict(a, b),
    FactCategory::Guidance => guidance_conflicts(a, b, thresholds),
    FactCategory::Entity
    | FactCategory::Definition
    | FactCategory::Exemption
    | FactCategory::Authority
    | FactCategory::Amendment
    | FactCategory::Other(_) => false,
  }
}

fn apart(a: DateTime<Utc>, b: DateTime<Utc>, hours: i64) -> bool {
  (a - b).abs() > Duration::hours(hours)
}

/// Same sub-type, and the dates differ by more than the tolerance.
pub fn dates_conflict(a: &Value, b: &Value, t: &DetectionThresholds) -> bool {
  let (Some(a), Some(b)) = (DateClaim::from_value(a), DateClaim::from_value(b))
  else {
    return false;
  };
  match (a.kind(), b.kind()) {
    (Some(ka), Some(kb)) if ka == kb => {}
    _ => return false,
  }
  match (a.when(), b.when()) {
    (Some(wa), Some(wb)) => apart(wa, wb, t.date_tolerance_hours),
    _ => false,
  }
}

/// Similar descriptions, and either the deadlines or the priorities disagree.
pub fn requirements_conflict(
  a: &Value,
  b: &Value,
  t: &DetectionThresholds,
) -> bool {
  let (Some(a), Some(b)) =
    (RequirementClaim::from_value(a), RequirementClaim::from_value(b))
  else {
    return false;
  };
  if jaccard(a.description.as_deref(), b.description.as_deref())
    <= t.requirement_similarity
  {
    return false;
  }

  let deadlines_differ = match (a.deadline(), b.deadline()) {
    (Some(da), Some(db)) => apart(da, db, t.date_tolerance_hours),
    _ => false,
  };
  let priorities_differ = match (a.priority_level(), b.priority_level()) {
    (Some(pa), Some(pb)) => (pa - pb).abs() > 1,
    _ => false,
  };
  deadlines_differ || priorities_differ
}

/// Same impact sub-type, similar descriptions, severities more than one
/// level apart.
pub fn impacts_conflict(a: &Value, b: &Value, t: &DetectionThresholds) -> bool {
  let (Some(a), Some(b)) =
    (ImpactClaim::from_value(a), ImpactClaim::from_value(b))
  else {
    return false;
  };
  match (a.kind(), b.kind()) {
    (Some(ka), Some(kb)) if ka == kb => {}
    _ => return false,
  }
  if jaccard(a.description.as_deref(), b.description.as_deref())
    <= t.impact_similarity
  {
    return false;
  }
  match (a.severity_level(), b.severity_level()) {
    (Some(sa), Some(sb)) => (sa - sb).abs() > 1,
    _ => false,
  }
}

/// The opposed keywords mentioned in a status text, matched as whole words
/// so that "inactive" does not also count as "active".
pub fn status_keywords(text: &str) -> BTreeSet<&'static str> {
  let words = word_set(text);
  OPPOSED_STATUS_KEYWORDS
    .iter()
    .copied()
    .filter(|k| words.contains(*k))
    .collect()
}

/// Both statuses mention opposed keywords, and not the same ones.
pub fn statuses_conflict(a: &Value, b: &Value) -> bool {
  let (Some(a), Some(b)) = (status_text(a), status_text(b)) else {
    return false;
  };
  let ka = status_keywords(a);
  let kb = status_keywords(b);
  !ka.is_empty() && !kb.is_empty() && ka != kb
}

/// Moderately similar guidance: related enough to be about the same thing,
/// different enough not to be a restatement. Both bounds are exclusive.
pub fn guidance_conflicts(
  a: &Value,
  b: &Value,
  t: &DetectionThresholds,
) -> bool {
  let similarity = jaccard(guidance_text(a), guidance_text(b));
  similarity > t.guidance_min_similarity && similarity < t.guidance_max_similarity
}
