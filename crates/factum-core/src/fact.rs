//! Fact types — the fundamental unit of the Factum store.
//!
//! A fact is a single attributed claim about a tracked document. It carries
//! one or more source attributions (its provenance) and zero or more typed,
//! directed relationships to other facts. Facts change only through an
//! explicit full replacement ([`FactReplacement`]); they are never merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::taxonomy::{FactCategory, RelationshipType};

// ─── Provenance ──────────────────────────────────────────────────────────────

/// Links a fact to the external source it was extracted from.
///
/// The owning fact is implied by containment in [`Fact::sources`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
  /// Key into the source registry.
  pub source_id:         Uuid,
  /// Free-text locator within the source, e.g. "Section 3¶2".
  pub context:           Option<String>,
  pub extraction_date:   DateTime<Utc>,
  /// How the claim was obtained, e.g. "ai_summary", "manual".
  pub extraction_method: String,
  #[serde(default)]
  pub metadata:          serde_json::Value,
}

impl SourceAttribution {
  pub fn new(
    source_id: Uuid,
    extraction_date: DateTime<Utc>,
    extraction_method: impl Into<String>,
  ) -> Self {
    Self {
      source_id,
      context: None,
      extraction_date,
      extraction_method: extraction_method.into(),
      metadata: serde_json::Value::Null,
    }
  }
}

// ─── Relationship graph ──────────────────────────────────────────────────────

/// A typed, directed edge from `fact_id` to `related_fact_id`.
///
/// Edges are informational; cycles are permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
  pub fact_id:           Uuid,
  pub related_fact_id:   Uuid,
  pub relationship_type: RelationshipType,
  pub description:       Option<String>,
  pub confidence:        f64,
}

/// An outgoing edge supplied with a [`NewFact`] or [`FactReplacement`]; the
/// source end is the fact being written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRelationship {
  pub related_fact_id:   Uuid,
  pub relationship_type: RelationshipType,
  pub description:       Option<String>,
  pub confidence:        f64,
}

impl NewRelationship {
  pub fn new(related_fact_id: Uuid, relationship_type: RelationshipType) -> Self {
    Self {
      related_fact_id,
      relationship_type,
      description: None,
      confidence: 1.0,
    }
  }

  /// Attach this edge to its source fact.
  pub fn attach(self, fact_id: Uuid) -> Relationship {
    Relationship {
      fact_id,
      related_fact_id: self.related_fact_id,
      relationship_type: self.relationship_type,
      description: self.description,
      confidence: clamp_confidence(self.confidence),
    }
  }
}

// ─── Fact ────────────────────────────────────────────────────────────────────

/// A stored claim about a document, with its provenance and outgoing edges
/// loaded eagerly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
  pub fact_id:       Uuid,
  pub document_id:   Uuid,
  pub category:      FactCategory,
  /// Category-dependent payload; see [`crate::value`] for the shapes the
  /// conflict detector understands.
  pub value:         serde_json::Value,
  /// Extraction confidence in `[0, 1]`.
  pub confidence:    f64,
  /// Server-assigned.
  pub created_at:    DateTime<Utc>,
  /// Server-assigned; bumped by every replacement.
  pub updated_at:    DateTime<Utc>,
  pub sources:       Vec<SourceAttribution>,
  pub relationships: Vec<Relationship>,
}

impl Fact {
  /// The latest extraction date across this fact's own attributions.
  pub fn latest_extraction(&self) -> Option<DateTime<Utc>> {
    self.sources.iter().map(|s| s.extraction_date).max()
  }
}

// ─── NewFact ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::FactStore::store_fact`], built by an upstream
/// fact producer. Identity and timestamps are always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewFact {
  pub document_id:   Uuid,
  pub category:      FactCategory,
  pub value:         serde_json::Value,
  pub confidence:    f64,
  pub sources:       Vec<SourceAttribution>,
  pub relationships: Vec<NewRelationship>,
}

impl NewFact {
  /// Convenience constructor with full confidence and no provenance.
  pub fn new(
    document_id: Uuid,
    category: FactCategory,
    value: serde_json::Value,
  ) -> Self {
    Self {
      document_id,
      category,
      value,
      confidence: 1.0,
      sources: Vec::new(),
      relationships: Vec::new(),
    }
  }

  pub fn with_confidence(mut self, confidence: f64) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn with_source(mut self, source: SourceAttribution) -> Self {
    self.sources.push(source);
    self
  }

  pub fn with_relationship(mut self, relationship: NewRelationship) -> Self {
    self.relationships.push(relationship);
    self
  }
}

// ─── FactReplacement ─────────────────────────────────────────────────────────

/// Input to [`crate::store::FactStore::update_fact`].
///
/// This is a full replacement, never a partial update: `value` and
/// `confidence` overwrite the stored ones, and the stored attributions and
/// outgoing relationships are discarded in favour of exactly the sets given
/// here. Category and document are fixed at creation.
#[derive(Debug, Clone)]
pub struct FactReplacement {
  pub fact_id:       Uuid,
  pub value:         serde_json::Value,
  pub confidence:    f64,
  pub sources:       Vec<SourceAttribution>,
  pub relationships: Vec<NewRelationship>,
}

impl From<Fact> for FactReplacement {
  fn from(fact: Fact) -> Self {
    Self {
      fact_id:       fact.fact_id,
      value:         fact.value,
      confidence:    fact.confidence,
      sources:       fact.sources,
      relationships: fact
        .relationships
        .into_iter()
        .map(|r| NewRelationship {
          related_fact_id:   r.related_fact_id,
          relationship_type: r.relationship_type,
          description:       r.description,
          confidence:        r.confidence,
        })
        .collect(),
    }
  }
}

// ─── Search ──────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::FactStore::search_facts`].
#[derive(Debug, Clone)]
pub struct FactSearch {
  pub category:       Option<FactCategory>,
  /// Substring filter applied over the serialised fact value.
  pub text:           Option<String>,
  pub min_confidence: f64,
  pub limit:          usize,
}

impl Default for FactSearch {
  fn default() -> Self {
    Self {
      category:       None,
      text:           None,
      min_confidence: 0.0,
      limit:          100,
    }
  }
}

/// Confidence is stored in `[0, 1]`; NaN is treated as no confidence.
pub fn clamp_confidence(c: f64) -> f64 {
  if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) }
}
