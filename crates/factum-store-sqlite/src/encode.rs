//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Payloads and metadata are
//! stored as compact JSON. UUIDs are stored as hyphenated lowercase strings.
//! Taxonomy tags are stored verbatim and decoded leniently.

use chrono::{DateTime, Utc};
use factum_core::{
  conflict::{ConflictRecord, Severity},
  fact::{Fact, Relationship, SourceAttribution},
  source::Source,
  taxonomy::{ConflictStatus, FactCategory, RelationshipType, ResolutionStrategy},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── JSON ─────────────────────────────────────────────────────────────────────

pub fn encode_json(v: &serde_json::Value) -> String { v.to_string() }

pub fn decode_json(s: &str) -> Result<serde_json::Value> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `facts` row.
pub struct RawFact {
  pub fact_id:     String,
  pub document_id: String,
  pub category:    String,
  pub value_json:  String,
  pub confidence:  f64,
  pub created_at:  String,
  pub updated_at:  String,
}

/// Column list matching [`RawFact::from_row`].
pub const FACT_COLUMNS: &str =
  "fact_id, document_id, category, value_json, confidence, created_at, updated_at";

impl RawFact {
  pub fn from_fact(f: &Fact) -> Self {
    Self {
      fact_id:     encode_uuid(f.fact_id),
      document_id: encode_uuid(f.document_id),
      category:    f.category.as_str().to_owned(),
      value_json:  encode_json(&f.value),
      confidence:  f.confidence,
      created_at:  encode_dt(f.created_at),
      updated_at:  encode_dt(f.updated_at),
    }
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fact_id:     row.get(0)?,
      document_id: row.get(1)?,
      category:    row.get(2)?,
      value_json:  row.get(3)?,
      confidence:  row.get(4)?,
      created_at:  row.get(5)?,
      updated_at:  row.get(6)?,
    })
  }
}

/// A fact row together with its attribution and relationship rows.
pub struct RawFactBundle {
  pub fact:          RawFact,
  pub sources:       Vec<RawAttribution>,
  pub relationships: Vec<RawRelationship>,
}

impl RawFactBundle {
  pub fn from_fact(f: &Fact) -> Self {
    Self {
      fact:          RawFact::from_fact(f),
      sources:       f.sources.iter().map(RawAttribution::from_attribution).collect(),
      relationships: f
        .relationships
        .iter()
        .map(RawRelationship::from_relationship)
        .collect(),
    }
  }

  pub fn into_fact(self) -> Result<Fact> {
    let f = self.fact;
    Ok(Fact {
      fact_id:       decode_uuid(&f.fact_id)?,
      document_id:   decode_uuid(&f.document_id)?,
      category:      FactCategory::parse(&f.category),
      value:         decode_json(&f.value_json)?,
      confidence:    f.confidence,
      created_at:    decode_dt(&f.created_at)?,
      updated_at:    decode_dt(&f.updated_at)?,
      sources:       self
        .sources
        .into_iter()
        .map(RawAttribution::into_attribution)
        .collect::<Result<_>>()?,
      relationships: self
        .relationships
        .into_iter()
        .map(RawRelationship::into_relationship)
        .collect::<Result<_>>()?,
    })
  }
}

/// Raw strings read from a `fact_sources` row.
pub struct RawAttribution {
  pub source_id:         String,
  pub context:           Option<String>,
  pub extraction_date:   String,
  pub extraction_method: String,
  pub metadata:          String,
}

impl RawAttribution {
  pub fn from_attribution(a: &SourceAttribution) -> Self {
    Self {
      source_id:         encode_uuid(a.source_id),
      context:           a.context.clone(),
      extraction_date:   encode_dt(a.extraction_date),
      extraction_method: a.extraction_method.clone(),
      metadata:          encode_json(&a.metadata),
    }
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      source_id:         row.get(0)?,
      context:           row.get(1)?,
      extraction_date:   row.get(2)?,
      extraction_method: row.get(3)?,
      metadata:          row.get(4)?,
    })
  }

  pub fn into_attribution(self) -> Result<SourceAttribution> {
    Ok(SourceAttribution {
      source_id:         decode_uuid(&self.source_id)?,
      context:           self.context,
      extraction_date:   decode_dt(&self.extraction_date)?,
      extraction_method: self.extraction_method,
      metadata:          decode_json(&self.metadata)?,
    })
  }
}

/// Raw strings read from a `fact_relationships` row.
pub struct RawRelationship {
  pub fact_id:           String,
  pub related_fact_id:   String,
  pub relationship_type: String,
  pub description:       Option<String>,
  pub confidence:        f64,
}

impl RawRelationship {
  pub fn from_relationship(r: &Relationship) -> Self {
    Self {
      fact_id:           encode_uuid(r.fact_id),
      related_fact_id:   encode_uuid(r.related_fact_id),
      relationship_type: r.relationship_type.as_str().to_owned(),
      description:       r.description.clone(),
      confidence:        r.confidence,
    }
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fact_id:           row.get(0)?,
      related_fact_id:   row.get(1)?,
      relationship_type: row.get(2)?,
      description:       row.get(3)?,
      confidence:        row.get(4)?,
    })
  }

  pub fn into_relationship(self) -> Result<Relationship> {
    Ok(Relationship {
      fact_id:           decode_uuid(&self.fact_id)?,
      related_fact_id:   decode_uuid(&self.related_fact_id)?,
      relationship_type: RelationshipType::parse(&self.relationship_type),
      description:       self.description,
      confidence:        self.confidence,
    })
  }
}

/// Raw strings read from a `sources` row.
pub struct RawSource {
  pub source_id:    String,
  pub name:         String,
  pub authority:    Option<String>,
  pub last_updated: Option<String>,
  pub metadata:     String,
}

/// Column list matching [`RawSource::from_row`].
pub const SOURCE_COLUMNS: &str = "source_id, name, authority, last_updated, metadata";

impl RawSource {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      source_id:    row.get(0)?,
      name:         row.get(1)?,
      authority:    row.get(2)?,
      last_updated: row.get(3)?,
      metadata:     row.get(4)?,
    })
  }

  pub fn into_source(self) -> Result<Source> {
    Ok(Source {
      source_id:    decode_uuid(&self.source_id)?,
      name:         self.name,
      authority:    self.authority,
      last_updated: decode_opt_dt(self.last_updated)?,
      metadata:     decode_json(&self.metadata)?,
    })
  }
}

/// Raw strings read from a `conflicts` row.
pub struct RawConflict {
  pub conflict_id:         String,
  pub document_id:         String,
  pub conflict_type:       String,
  pub severity:            String,
  pub fact1_id:            String,
  pub fact2_id:            String,
  pub detection_date:      String,
  pub status:              String,
  pub resolution_strategy: Option<String>,
  pub selected_fact_id:    Option<String>,
  pub resolution_date:     Option<String>,
  pub resolution_by:       Option<String>,
  pub resolution_notes:    Option<String>,
}

/// Column list matching [`RawConflict::from_row`].
pub const CONFLICT_COLUMNS: &str = "conflict_id, document_id, conflict_type, \
   severity, fact1_id, fact2_id, detection_date, status, resolution_strategy, \
   selected_fact_id, resolution_date, resolution_by, resolution_notes";

impl RawConflict {
  pub fn from_conflict(c: &ConflictRecord) -> Self {
    Self {
      conflict_id:         encode_uuid(c.conflict_id),
      document_id:         encode_uuid(c.document_id),
      conflict_type:       c.conflict_type.as_str().to_owned(),
      severity:            c.severity.as_str().to_owned(),
      fact1_id:            encode_uuid(c.fact1_id),
      fact2_id:            encode_uuid(c.fact2_id),
      detection_date:      encode_dt(c.detection_date),
      status:              c.status.as_str().to_owned(),
      resolution_strategy: c.resolution_strategy.as_ref().map(|s| s.as_str().to_owned()),
      selected_fact_id:    c.selected_fact_id.map(encode_uuid),
      resolution_date:     c.resolution_date.map(encode_dt),
      resolution_by:       c.resolution_by.clone(),
      resolution_notes:    c.resolution_notes.clone(),
    }
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      conflict_id:         row.get(0)?,
      document_id:         row.get(1)?,
      conflict_type:       row.get(2)?,
      severity:            row.get(3)?,
      fact1_id:            row.get(4)?,
      fact2_id:            row.get(5)?,
      detection_date:      row.get(6)?,
      status:              row.get(7)?,
      resolution_strategy: row.get(8)?,
      selected_fact_id:    row.get(9)?,
      resolution_date:     row.get(10)?,
      resolution_by:       row.get(11)?,
      resolution_notes:    row.get(12)?,
    })
  }

  pub fn into_conflict(self) -> Result<ConflictRecord> {
    Ok(ConflictRecord {
      conflict_id:         decode_uuid(&self.conflict_id)?,
      document_id:         decode_uuid(&self.document_id)?,
      conflict_type:       FactCategory::parse(&self.conflict_type),
      severity:            Severity::parse(&self.severity),
      fact1_id:            decode_uuid(&self.fact1_id)?,
      fact2_id:            decode_uuid(&self.fact2_id)?,
      detection_date:      decode_dt(&self.detection_date)?,
      status:              ConflictStatus::parse(&self.status),
      resolution_strategy: self
        .resolution_strategy
        .as_deref()
        .map(ResolutionStrategy::parse),
      selected_fact_id:    decode_opt_uuid(self.selected_fact_id)?,
      resolution_date:     decode_opt_dt(self.resolution_date)?,
      resolution_by:       self.resolution_by,
      resolution_notes:    self.resolution_notes,
    })
  }
}
