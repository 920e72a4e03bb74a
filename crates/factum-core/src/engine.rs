//! [`ConflictEngine`]: detection, classification, and resolution of
//! conflicts between the facts of one document.
//!
//! Detection and auto-resolution are triggered per document by an external
//! orchestrator; nothing here runs in the background.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error,
  config::EngineConfig,
  conflict::{ConflictRecord, ConflictSummary, FactPair, NewConflict, ResolutionUpdate},
  detect::facts_conflict,
  fact::Fact,
  resolution::{Resolution, ResolutionEngine},
  severity::classify,
  source::SourceSnapshot,
  store::FactStore,
  taxonomy::{ConflictStatus, FactCategory, ResolutionStrategy},
};

/// Actor recorded on conflicts resolved by the cascade.
pub const AUTO_RESOLVER: &str = "auto";

/// Orchestrates conflict detection and resolution over a [`FactStore`].
pub struct ConflictEngine<S> {
  store:    S,
  config:   EngineConfig,
  resolver: ResolutionEngine,
}

impl<S: FactStore> ConflictEngine<S> {
  pub fn new(store: S, config: EngineConfig) -> Self {
    let resolver = ResolutionEngine::new(config.resolution.clone());
    Self { store, config, resolver }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  pub fn resolver(&self) -> &ResolutionEngine { &self.resolver }

  // ── Detection ─────────────────────────────────────────────────────────

  /// Compare every unordered pair of same-category facts in a document and
  /// record each genuine disagreement not already on file.
  ///
  /// New conflicts admitted by the auto-resolve policy are immediately run
  /// through the resolution cascade. Returns the newly created records in
  /// their final state; a second run over unchanged facts returns nothing.
  pub async fn detect_conflicts(
    &self,
    document_id: Uuid,
  ) -> Result<Vec<ConflictRecord>, S::Error> {
    let facts = self
      .store
      .get_facts_for_document(document_id, None, 0.0)
      .await?;

    let known: HashSet<FactPair> = self
      .store
      .get_conflicts_for_document(document_id)
      .await?
      .iter()
      .filter_map(|c| c.pair().ok())
      .collect();

    let mut groups: BTreeMap<&FactCategory, Vec<&Fact>> = BTreeMap::new();
    for fact in &facts {
      groups.entry(&fact.category).or_default().push(fact);
    }

    let mut created = Vec::new();
    for (category, group) in groups {
      for (i, a) in group.iter().enumerate() {
        for b in &group[i + 1..] {
          let pair = FactPair::new(a.fact_id, b.fact_id)?;
          if known.contains(&pair) {
            continue;
          }
          if !facts_conflict(category, &a.value, &b.value, &self.config.detection) {
            continue;
          }

          let severity = classify(category, &a.value, &b.value);
          let inserted = self
            .store
            .insert_conflict(NewConflict {
              document_id,
              conflict_type: category.clone(),
              severity,
              fact1_id: a.fact_id,
              fact2_id: b.fact_id,
            })
            .await?;
          let Some(record) = inserted else {
            tracing::debug!(
              fact1 = %a.fact_id,
              fact2 = %b.fact_id,
              "conflict already recorded by another writer"
            );
            continue;
          };
          tracing::debug!(
            conflict = %record.conflict_id,
            category = %category,
            severity = severity.as_str(),
            "conflict detected"
          );

          let record = if self.config.auto_resolve.admits(severity) {
            self.auto_resolve(record, a, b).await?
          } else {
            record
          };
          created.push(record);
        }
      }
    }

    tracing::info!(
      document = %document_id,
      facts = facts.len(),
      created = created.len(),
      "conflict detection finished"
    );
    Ok(created)
  }

  // ── Resolution ────────────────────────────────────────────────────────

  /// Snapshot the registry entries referenced by two facts and run the
  /// cascade over them.
  pub async fn resolve_facts(
    &self,
    a: &Fact,
    b: &Fact,
  ) -> Result<Option<Resolution>, S::Error> {
    let snapshot = self.snapshot_for(a, b).await?;
    Ok(self.resolver.resolve(a, b, &snapshot))
  }

  /// Run the cascade for an unresolved conflict regardless of its severity.
  ///
  /// Writes `resolved_auto` when a strategy decides. Returns `None` and
  /// leaves the record untouched when none does, or when the conflict is not
  /// `unresolved`: manual decisions and flags are never overwritten.
  pub async fn resolve_conflict(
    &self,
    conflict_id: Uuid,
  ) -> Result<Option<ConflictRecord>, S::Error> {
    let conflict = self.require_conflict(conflict_id).await?;
    if conflict.status != ConflictStatus::Unresolved {
      tracing::debug!(
        conflict = %conflict_id,
        status = %conflict.status,
        "conflict already decided; skipping cascade"
      );
      return Ok(None);
    }
    let a = self.require_fact(conflict.fact1_id).await?;
    let b = self.require_fact(conflict.fact2_id).await?;

    let Some(resolution) = self.resolve_facts(&a, &b).await? else {
      tracing::info!(conflict = %conflict_id, "no strategy could resolve conflict");
      return Ok(None);
    };
    self.write_auto(conflict_id, resolution).await.map(Some)
  }

  /// Record a human decision for a conflict.
  ///
  /// `selected_fact_id` must be one of the conflict's two facts. Overrides
  /// any earlier automatic resolution or flag.
  pub async fn resolve_conflict_manually(
    &self,
    conflict_id: Uuid,
    selected_fact_id: Uuid,
    notes: Option<String>,
    actor: impl Into<String>,
  ) -> Result<ConflictRecord, S::Error> {
    let conflict = self.require_conflict(conflict_id).await?;
    if !conflict.involves(selected_fact_id) {
      return Err(
        Error::InvalidSelection { conflict_id, fact_id: selected_fact_id }.into(),
      );
    }

    let actor = actor.into();
    tracing::info!(
      conflict = %conflict_id,
      selected = %selected_fact_id,
      actor = %actor,
      "conflict resolved manually"
    );
    self
      .write(conflict_id, ResolutionUpdate {
        status:           ConflictStatus::ResolvedManual,
        strategy:         Some(ResolutionStrategy::Manual),
        selected_fact_id: Some(selected_fact_id),
        resolved_at:      Utc::now(),
        resolved_by:      Some(actor),
        notes,
      })
      .await
  }

  /// Escalate a conflict for external judgment without picking a winner.
  pub async fn flag_conflict(
    &self,
    conflict_id: Uuid,
    notes: Option<String>,
  ) -> Result<ConflictRecord, S::Error> {
    self.require_conflict(conflict_id).await?;
    tracing::info!(conflict = %conflict_id, "conflict flagged for review");
    self
      .write(conflict_id, ResolutionUpdate {
        status: ConflictStatus::Flagged,
        strategy: None,
        selected_fact_id: None,
        resolved_at: Utc::now(),
        resolved_by: None,
        notes,
      })
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get_conflicts_for_document(
    &self,
    document_id: Uuid,
  ) -> Result<Vec<ConflictRecord>, S::Error> {
    self.store.get_conflicts_for_document(document_id).await
  }

  pub async fn get_unresolved_conflicts(
    &self,
    document_id: Option<Uuid>,
  ) -> Result<Vec<ConflictRecord>, S::Error> {
    self.store.get_unresolved_conflicts(document_id).await
  }

  /// Conflict counts by status and severity for one document.
  pub async fn conflict_summary(
    &self,
    document_id: Uuid,
  ) -> Result<ConflictSummary, S::Error> {
    let records = self.store.get_conflicts_for_document(document_id).await?;
    Ok(ConflictSummary::from_records(&records))
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn auto_resolve(
    &self,
    record: ConflictRecord,
    a: &Fact,
    b: &Fact,
  ) -> Result<ConflictRecord, S::Error> {
    match self.resolve_facts(a, b).await? {
      Some(resolution) => self.write_auto(record.conflict_id, resolution).await,
      None => {
        tracing::debug!(
          conflict = %record.conflict_id,
          "auto-resolution undecided; leaving unresolved"
        );
        Ok(record)
      }
    }
  }

  async fn write_auto(
    &self,
    conflict_id: Uuid,
    resolution: Resolution,
  ) -> Result<ConflictRecord, S::Error> {
    tracing::info!(
      conflict = %conflict_id,
      strategy = %resolution.strategy,
      selected = %resolution.selected_fact_id,
      "conflict resolved automatically"
    );
    self
      .write(conflict_id, ResolutionUpdate {
        status:           ConflictStatus::ResolvedAuto,
        strategy:         Some(resolution.strategy),
        selected_fact_id: Some(resolution.selected_fact_id),
        resolved_at:      Utc::now(),
        resolved_by:      Some(AUTO_RESOLVER.to_owned()),
        notes:            Some(resolution.rationale),
      })
      .await
  }

  async fn write(
    &self,
    conflict_id: Uuid,
    update: ResolutionUpdate,
  ) -> Result<ConflictRecord, S::Error> {
    self
      .store
      .record_resolution(conflict_id, update)
      .await?
      .ok_or_else(|| Error::ConflictNotFound(conflict_id).into())
  }

  async fn snapshot_for(&self, a: &Fact, b: &Fact) -> Result<SourceSnapshot, S::Error> {
    let mut ids: Vec<Uuid> = a
      .sources
      .iter()
      .chain(&b.sources)
      .map(|s| s.source_id)
      .collect();
    ids.sort_unstable();
    ids.dedup();
    self.store.get_sources(ids).await
  }

  async fn require_conflict(&self, conflict_id: Uuid) -> Result<ConflictRecord, S::Error> {
    self
      .store
      .get_conflict(conflict_id)
      .await?
      .ok_or_else(|| Error::ConflictNotFound(conflict_id).into())
  }

  async fn require_fact(&self, fact_id: Uuid) -> Result<Fact, S::Error> {
    self
      .store
      .get_fact(fact_id)
      .await?
      .ok_or_else(|| Error::FactNotFound(fact_id).into())
  }
}
