//! The source registry: named upstream channels that facts are attributed to.
//!
//! Resolution consults a [`SourceSnapshot`] taken from the registry so that a
//! decision depends only on the data in hand, not on registry state at the
//! moment each strategy runs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered upstream source, e.g. "Federal Register".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
  pub source_id:    Uuid,
  /// Name used to look up the configured source priority.
  pub name:         String,
  /// Publishing authority, if known.
  pub authority:    Option<String>,
  /// When the source itself was last updated.
  pub last_updated: Option<DateTime<Utc>>,
  #[serde(default)]
  pub metadata:     serde_json::Value,
}

/// Input to [`crate::store::FactStore::register_source`].
#[derive(Debug, Clone)]
pub struct NewSource {
  pub name:         String,
  pub authority:    Option<String>,
  pub last_updated: Option<DateTime<Utc>>,
  pub metadata:     serde_json::Value,
}

impl NewSource {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:         name.into(),
      authority:    None,
      last_updated: None,
      metadata:     serde_json::Value::Null,
    }
  }

  pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
    self.last_updated = Some(at);
    self
  }
}

/// An immutable view of the registry entries relevant to one resolution.
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshot {
  sources: HashMap<Uuid, Source>,
}

impl SourceSnapshot {
  pub fn get(&self, source_id: &Uuid) -> Option<&Source> {
    self.sources.get(source_id)
  }

  pub fn len(&self) -> usize { self.sources.len() }

  pub fn is_empty(&self) -> bool { self.sources.is_empty() }
}

impl FromIterator<Source> for SourceSnapshot {
  fn from_iter<I: IntoIterator<Item = Source>>(iter: I) -> Self {
    Self {
      sources: iter.into_iter().map(|s| (s.source_id, s)).collect(),
    }
  }
}
