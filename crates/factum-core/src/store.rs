//! The `FactStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `factum-store-sqlite`).
//! The conflict engine and any outer service layer depend on this
//! abstraction, not on a concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  conflict::{ConflictRecord, NewConflict, ResolutionUpdate},
  fact::{Fact, FactReplacement, FactSearch, NewFact, Relationship},
  source::{NewSource, Source, SourceSnapshot},
  taxonomy::{FactCategory, RelationshipType},
};

/// Abstraction over a Factum storage backend.
///
/// Every multi-row write (a fact with its attributions and relationships, a
/// replacement, a conflict insert) is atomic: on failure nothing is visible
/// and the backend error is returned unchanged.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait FactStore: Send + Sync {
  type Error: std::error::Error + From<crate::Error> + Send + Sync + 'static;

  // ── Facts ─────────────────────────────────────────────────────────────

  /// Persist a new fact together with its attributions and outgoing
  /// relationships. Id and timestamps are assigned by the store.
  fn store_fact(
    &self,
    input: NewFact,
  ) -> impl Future<Output = Result<Fact, Self::Error>> + Send + '_;

  /// All facts for a document, optionally restricted to one category and a
  /// minimum confidence, with sources and relationships loaded.
  fn get_facts_for_document(
    &self,
    document_id: Uuid,
    category: Option<FactCategory>,
    min_confidence: f64,
  ) -> impl Future<Output = Result<Vec<Fact>, Self::Error>> + Send + '_;

  /// Retrieve a fact by id. Returns `None` if not found.
  fn get_fact(
    &self,
    fact_id: Uuid,
  ) -> impl Future<Output = Result<Option<Fact>, Self::Error>> + Send + '_;

  /// Replace a fact's value, confidence, attributions, and outgoing
  /// relationships wholesale. This never merges with the stored sets.
  ///
  /// Fails with [`crate::Error::MissingFactId`] for a nil id and
  /// [`crate::Error::FactNotFound`] for an unknown one.
  fn update_fact(
    &self,
    replacement: FactReplacement,
  ) -> impl Future<Output = Result<Fact, Self::Error>> + Send + '_;

  /// Search facts across documents. Text matches are substring matches over
  /// the serialised value.
  fn search_facts<'a>(
    &'a self,
    query: &'a FactSearch,
  ) -> impl Future<Output = Result<Vec<Fact>, Self::Error>> + Send + 'a;

  // ── Relationship graph ────────────────────────────────────────────────

  /// Author-asserted `contradicts` edges whose endpoints both belong to the
  /// document. Independent of detected conflicts.
  fn find_contradictions(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;

  /// Outgoing edges of a fact, optionally of one type.
  fn relationships_from(
    &self,
    fact_id: Uuid,
    relationship_type: Option<RelationshipType>,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;

  /// Incoming edges of a fact, optionally of one type.
  fn relationships_to(
    &self,
    fact_id: Uuid,
    relationship_type: Option<RelationshipType>,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;

  // ── Source registry ───────────────────────────────────────────────────

  fn register_source(
    &self,
    input: NewSource,
  ) -> impl Future<Output = Result<Source, Self::Error>> + Send + '_;

  /// Record that a source was updated. Returns `None` if not registered.
  fn update_source_timestamp(
    &self,
    source_id: Uuid,
    last_updated: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Source>, Self::Error>> + Send + '_;

  /// Snapshot the registry entries for `source_ids`; unknown ids are absent.
  fn get_sources(
    &self,
    source_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<SourceSnapshot, Self::Error>> + Send + '_;

  // ── Conflict records ──────────────────────────────────────────────────

  /// Insert a conflict unless one already exists for the same unordered
  /// fact pair. Returns `None` when the pair was already recorded.
  fn insert_conflict(
    &self,
    input: NewConflict,
  ) -> impl Future<Output = Result<Option<ConflictRecord>, Self::Error>> + Send + '_;

  fn get_conflict(
    &self,
    conflict_id: Uuid,
  ) -> impl Future<Output = Result<Option<ConflictRecord>, Self::Error>> + Send + '_;

  /// Every conflict recorded for a document, oldest first.
  fn get_conflicts_for_document(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ConflictRecord>, Self::Error>> + Send + '_;

  /// Unresolved conflicts, for one document or across all of them.
  fn get_unresolved_conflicts(
    &self,
    document_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<ConflictRecord>, Self::Error>> + Send + '_;

  /// Overwrite a conflict's status and resolution fields. Returns `None` if
  /// the conflict does not exist.
  fn record_resolution(
    &self,
    conflict_id: Uuid,
    update: ResolutionUpdate,
  ) -> impl Future<Output = Result<Option<ConflictRecord>, Self::Error>> + Send + '_;
}
