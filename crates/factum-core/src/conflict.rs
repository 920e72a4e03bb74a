//! Conflict records and their lifecycle.
//!
//! A conflict is a detected disagreement between two facts of the same
//! category about the same document. Records are append-only: they are
//! created by the detector, updated in place only by resolution or flagging,
//! and never deleted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  taxonomy::{ConflictStatus, FactCategory, ResolutionStrategy},
};

// ─── Severity ────────────────────────────────────────────────────────────────

/// Coarse urgency tier assigned at detection time. Ordered `Low < Medium < High`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
}

impl Severity {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
    }
  }

  /// Lenient parse; an unknown tier is logged and read as `Medium`.
  pub fn parse(raw: &str) -> Self {
    match raw.trim().to_ascii_lowercase().as_str() {
      "low" => Self::Low,
      "medium" => Self::Medium,
      "high" => Self::High,
      other => {
        tracing::warn!(value = other, "unrecognised severity; treating as medium");
        Self::Medium
      }
    }
  }
}

// ─── Pair identity ───────────────────────────────────────────────────────────

/// An unordered pair of distinct facts, normalised so that `low < high`.
///
/// Two conflict records can never share a `FactPair`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactPair {
  low:  Uuid,
  high: Uuid,
}

impl FactPair {
  pub fn new(a: Uuid, b: Uuid) -> Result<Self> {
    if a == b {
      return Err(Error::SelfConflict(a));
    }
    Ok(if a < b { Self { low: a, high: b } } else { Self { low: b, high: a } })
  }

  pub fn low(&self) -> Uuid { self.low }

  pub fn high(&self) -> Uuid { self.high }

  pub fn contains(&self, id: Uuid) -> bool { self.low == id || self.high == id }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A persisted conflict between two facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
  pub conflict_id:         Uuid,
  pub document_id:         Uuid,
  /// The shared category of both facts at detection time.
  pub conflict_type:       FactCategory,
  pub severity:            Severity,
  pub fact1_id:            Uuid,
  pub fact2_id:            Uuid,
  pub detection_date:      DateTime<Utc>,
  pub status:              ConflictStatus,
  pub resolution_strategy: Option<ResolutionStrategy>,
  /// The winning fact, when a resolution picked one.
  pub selected_fact_id:    Option<Uuid>,
  pub resolution_date:     Option<DateTime<Utc>>,
  pub resolution_by:       Option<String>,
  pub resolution_notes:    Option<String>,
}

impl ConflictRecord {
  pub fn pair(&self) -> Result<FactPair> { FactPair::new(self.fact1_id, self.fact2_id) }

  pub fn involves(&self, fact_id: Uuid) -> bool {
    self.fact1_id == fact_id || self.fact2_id == fact_id
  }
}

/// Input to [`crate::store::FactStore::insert_conflict`].
#[derive(Debug, Clone)]
pub struct NewConflict {
  pub document_id:   Uuid,
  pub conflict_type: FactCategory,
  pub severity:      Severity,
  pub fact1_id:      Uuid,
  pub fact2_id:      Uuid,
}

/// The status/resolution fields written by
/// [`crate::store::FactStore::record_resolution`]. All of them are replaced.
#[derive(Debug, Clone)]
pub struct ResolutionUpdate {
  pub status:           ConflictStatus,
  pub strategy:         Option<ResolutionStrategy>,
  pub selected_fact_id: Option<Uuid>,
  pub resolved_at:      DateTime<Utc>,
  pub resolved_by:      Option<String>,
  pub notes:            Option<String>,
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// Per-document conflict counts for reporting layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictSummary {
  pub total:       usize,
  /// Keyed by status tag.
  pub by_status:   BTreeMap<String, usize>,
  pub by_severity: BTreeMap<Severity, usize>,
}

impl ConflictSummary {
  pub fn from_records<'a>(
    records: impl IntoIterator<Item = &'a ConflictRecord>,
  ) -> Self {
    let mut summary = Self::default();
    for record in records {
      summary.total += 1;
      *summary
        .by_status
        .entry(record.status.as_str().to_owned())
        .or_default() += 1;
      *summary.by_severity.entry(record.severity).or_default() += 1;
    }
    summary
  }

  pub fn unresolved(&self) -> usize {
    self
      .by_status
      .get(ConflictStatus::Unresolved.as_str())
      .copied()
      .unwrap_or(0)
  }
}
