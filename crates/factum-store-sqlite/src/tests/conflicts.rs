use factum_core::{
  EngineConfig,
  config::ResolutionSettings,
  conflict::{NewConflict, Severity},
  engine::AUTO_RESOLVER,
  fact::NewFact,
  source::NewSource,
  store::FactStore,
  taxonomy::{ConflictStatus, FactCategory, ResolutionStrategy},
};
use serde_json::json;
use uuid::Uuid;

use super::{date_fact, engine, extracted, status_fact, store};
use crate::Error;

fn requirement_fact(document_id: Uuid, description: &str, deadline: &str) -> NewFact {
  NewFact::new(
    document_id,
    FactCategory::Requirement,
    json!({ "description": description, "deadline": deadline, "priority": "high" }),
  )
}

fn impact_fact(document_id: Uuid, description: &str, severity: &str) -> NewFact {
  NewFact::new(
    document_id,
    FactCategory::Impact,
    json!({ "type": "economic", "description": description, "severity": severity }),
  )
}

fn guidance_fact(document_id: Uuid, text: &str) -> NewFact {
  NewFact::new(document_id, FactCategory::Guidance, json!(text))
}

fn prioritised() -> EngineConfig {
  EngineConfig {
    resolution: ResolutionSettings::default()
      .with_priority("Federal Register", 10)
      .with_priority("Unknown", 1),
    ..EngineConfig::default()
  }
}

// ─── Detection ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn conflicting_effective_dates_are_high_and_not_auto_resolved() {
  let e = engine(prioritised()).await;
  let doc = Uuid::new_v4();

  let fr = e
    .store()
    .register_source(NewSource::new("Federal Register"))
    .await
    .unwrap();
  let unknown = e.store().register_source(NewSource::new("Unknown")).await.unwrap();

  let official = e
    .store()
    .store_fact(
      date_fact(doc, "effective", "2025-04-01")
        .with_confidence(0.90)
        .with_source(extracted(fr.source_id)),
    )
    .await
    .unwrap();
  e.store()
    .store_fact(
      date_fact(doc, "effective", "2025-05-01")
        .with_confidence(0.85)
        .with_source(extracted(unknown.source_id)),
    )
    .await
    .unwrap();

  let created = e.detect_conflicts(doc).await.unwrap();
  assert_eq!(created.len(), 1);
  let conflict = &created[0];
  assert_eq!(conflict.conflict_type, FactCategory::Date);
  assert_eq!(conflict.severity, Severity::High);
  assert_eq!(conflict.status, ConflictStatus::Unresolved);
  assert!(conflict.resolution_strategy.is_none());

  let resolved = e
    .resolve_conflict(conflict.conflict_id)
    .await
    .unwrap()
    .expect("source priority decides");
  assert_eq!(resolved.status, ConflictStatus::ResolvedAuto);
  assert_eq!(resolved.resolution_strategy, Some(ResolutionStrategy::SourcePriority));
  assert_eq!(resolved.selected_fact_id, Some(official.fact_id));
  assert_eq!(resolved.resolution_by.as_deref(), Some(AUTO_RESOLVER));
  assert!(resolved.resolution_date.is_some());
  assert!(resolved.resolution_notes.is_some());
}

#[tokio::test]
async fn detection_is_idempotent() {
  let e = engine(EngineConfig::default()).await;
  let doc = Uuid::new_v4();

  e.store().store_fact(status_fact(doc, "active")).await.unwrap();
  e.store().store_fact(status_fact(doc, "revoked")).await.unwrap();

  assert_eq!(e.detect_conflicts(doc).await.unwrap().len(), 1);
  assert!(e.detect_conflicts(doc).await.unwrap().is_empty());
  assert_eq!(e.get_conflicts_for_document(doc).await.unwrap().len(), 1);
}

#[tokio::test]
async fn nearby_dates_and_different_kinds_do_not_conflict() {
  let e = engine(EngineConfig::default()).await;
  let doc = Uuid::new_v4();

  e.store()
    .store_fact(date_fact(doc, "effective", "2025-04-01"))
    .await
    .unwrap();
  e.store()
    .store_fact(date_fact(doc, "effective", "2025-04-01T12:00:00Z"))
    .await
    .unwrap();
  e.store()
    .store_fact(date_fact(doc, "comment_deadline", "2025-09-01"))
    .await
    .unwrap();

  assert!(e.detect_conflicts(doc).await.unwrap().is_empty());
}

#[tokio::test]
async fn similar_requirements_with_distant_deadlines_conflict() {
  let e = engine(prioritised()).await;
  let doc = Uuid::new_v4();
  let src = e
    .store()
    .register_source(NewSource::new("Federal Register"))
    .await
    .unwrap();

  // Nine shared words out of eleven: similarity ~0.82.
  e.store()
    .store_fact(
      requirement_fact(
        doc,
        "operators must submit annual emissions reports to state regulators online",
        "2025-03-01",
      )
      .with_source(extracted(src.source_id)),
    )
    .await
    .unwrap();
  e.store()
    .store_fact(
      requirement_fact(
        doc,
        "operators must submit annual emissions reports to state regulators electronically",
        "2025-04-16",
      )
      .with_source(extracted(src.source_id)),
    )
    .await
    .unwrap();

  let created = e.detect_conflicts(doc).await.unwrap();
  assert_eq!(created.len(), 1);
  assert_eq!(created[0].severity, Severity::High);

  // Same source, same extraction, same confidence: nothing decides.
  let outcome = e.resolve_conflict(created[0].conflict_id).await.unwrap();
  assert!(outcome.is_none());
  let stored = e
    .store()
    .get_conflict(created[0].conflict_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stored.status, ConflictStatus::Unresolved);
}

#[tokio::test]
async fn opposed_statuses_conflict_with_high_severity() {
  let e = engine(EngineConfig::default()).await;
  let doc = Uuid::new_v4();

  e.store()
    .store_fact(status_fact(doc, "Order remains active"))
    .await
    .unwrap();
  e.store()
    .store_fact(status_fact(doc, "Order was stayed by court"))
    .await
    .unwrap();

  let created = e.detect_conflicts(doc).await.unwrap();
  assert_eq!(created.len(), 1);
  assert_eq!(created[0].conflict_type, FactCategory::Status);
  assert_eq!(created[0].severity, Severity::High);
}

#[tokio::test]
async fn guidance_conflicts_only_inside_similarity_band() {
  let e = engine(EngineConfig::default()).await;
  let below = Uuid::new_v4();
  let inside = Uuid::new_v4();

  // 9 shared of 20 distinct words: 0.45, under the floor.
  e.store()
    .store_fact(guidance_fact(below, "w1 w2 w3 w4 w5 w6 w7 w8 w9 a1 a2 a3 a4 a5 a6"))
    .await
    .unwrap();
  e.store()
    .store_fact(guidance_fact(below, "w1 w2 w3 w4 w5 w6 w7 w8 w9 b1 b2 b3 b4 b5"))
    .await
    .unwrap();
  assert!(e.detect_conflicts(below).await.unwrap().is_empty());

  // 6 shared of 10: 0.60.
  e.store()
    .store_fact(guidance_fact(inside, "w1 w2 w3 w4 w5 w6 a1 a2"))
    .await
    .unwrap();
  e.store()
    .store_fact(guidance_fact(inside, "w1 w2 w3 w4 w5 w6 b1 b2"))
    .await
    .unwrap();
  let created = e.detect_conflicts(inside).await.unwrap();
  assert_eq!(created.len(), 1);
  assert_eq!(created[0].severity, Severity::Medium);
}

#[tokio::test]
async fn facts_of_different_categories_are_never_compared() {
  let e = engine(EngineConfig::default()).await;
  let doc = Uuid::new_v4();

  e.store()
    .store_fact(NewFact::new(doc, FactCategory::Status, json!("active")))
    .await
    .unwrap();
  e.store()
    .store_fact(NewFact::new(doc, FactCategory::Guidance, json!("revoked")))
    .await
    .unwrap();
  e.store()
    .store_fact(NewFact::new(doc, FactCategory::Entity, json!("EPA")))
    .await
    .unwrap();
  e.store()
    .store_fact(NewFact::new(doc, FactCategory::Entity, json!("FDA")))
    .await
    .unwrap();

  assert!(e.detect_conflicts(doc).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_detection_records_each_pair_once() {
  let s = store().await;
  let doc = Uuid::new_v4();
  s.store_fact(status_fact(doc, "active")).await.unwrap();
  s.store_fact(status_fact(doc, "revoked")).await.unwrap();

  let first = factum_core::ConflictEngine::new(s.clone(), EngineConfig::default());
  let second = factum_core::ConflictEngine::new(s.clone(), EngineConfig::default());

  let (a, b) = tokio::join!(first.detect_conflicts(doc), second.detect_conflicts(doc));
  assert_eq!(a.unwrap().len() + b.unwrap().len(), 1);
  assert_eq!(s.get_conflicts_for_document(doc).await.unwrap().len(), 1);
}

// ─── Auto-resolution ─────────────────────────────────────────────────────────

#[tokio::test]
async fn auto_resolution_follows_severity_gate() {
  let permissive = EngineConfig::from_toml_str(
    r#"
      [auto_resolve]
      max_severity = "medium"
    "#,
  )
  .unwrap();

  for (config, expect_resolved) in [(EngineConfig::default(), false), (permissive, true)] {
    let e = engine(config).await;
    let doc = Uuid::new_v4();

    let confident = e
      .store()
      .store_fact(
        impact_fact(doc, "small businesses face higher compliance costs", "high")
          .with_confidence(0.95),
      )
      .await
      .unwrap();
    e.store()
      .store_fact(
        impact_fact(doc, "small businesses face higher compliance costs annually", "low")
          .with_confidence(0.60),
      )
      .await
      .unwrap();

    let created = e.detect_conflicts(doc).await.unwrap();
    assert_eq!(created.len(), 1);
    let conflict = &created[0];
    assert_eq!(conflict.severity, Severity::Medium);

    if expect_resolved {
      assert_eq!(conflict.status, ConflictStatus::ResolvedAuto);
      assert_eq!(conflict.resolution_strategy, Some(ResolutionStrategy::Confidence));
      assert_eq!(conflict.selected_fact_id, Some(confident.fact_id));
      assert!(e.get_unresolved_conflicts(Some(doc)).await.unwrap().is_empty());
    } else {
      assert_eq!(conflict.status, ConflictStatus::Unresolved);
      assert_eq!(e.get_unresolved_conflicts(Some(doc)).await.unwrap().len(), 1);
    }
  }
}

#[tokio::test]
async fn disabled_policy_never_auto_resolves() {
  let mut config = EngineConfig::default();
  config.auto_resolve.enabled = false;
  config.auto_resolve.max_severity = Severity::High;
  let e = engine(config).await;
  let doc = Uuid::new_v4();

  e.store()
    .store_fact(status_fact(doc, "active").with_confidence(1.0))
    .await
    .unwrap();
  e.store()
    .store_fact(status_fact(doc, "revoked").with_confidence(0.2))
    .await
    .unwrap();

  let created = e.detect_conflicts(doc).await.unwrap();
  assert_eq!(created[0].status, ConflictStatus::Unresolved);
}

// ─── Manual resolution and flagging ──────────────────────────────────────────

#[tokio::test]
async fn manual_resolution_overrides_automatic() {
  let e = engine(prioritised()).await;
  let doc = Uuid::new_v4();
  let fr = e
    .store()
    .register_source(NewSource::new("Federal Register"))
    .await
    .unwrap();

  let official = e
    .store()
    .store_fact(status_fact(doc, "active").with_source(extracted(fr.source_id)))
    .await
    .unwrap();
  let other = e.store().store_fact(status_fact(doc, "revoked")).await.unwrap();

  let conflict = e.detect_conflicts(doc).await.unwrap().remove(0);
  let auto = e.resolve_conflict(conflict.conflict_id).await.unwrap().unwrap();
  assert_eq!(auto.selected_fact_id, Some(official.fact_id));

  let manual = e
    .resolve_conflict_manually(
      conflict.conflict_id,
      other.fact_id,
      Some("revocation published 2025-05-02".into()),
      "analyst@example.org",
    )
    .await
    .unwrap();

  assert_eq!(manual.status, ConflictStatus::ResolvedManual);
  assert_eq!(manual.resolution_strategy, Some(ResolutionStrategy::Manual));
  assert_eq!(manual.selected_fact_id, Some(other.fact_id));
  assert_eq!(manual.resolution_by.as_deref(), Some("analyst@example.org"));
  assert_eq!(manual.resolution_notes.as_deref(), Some("revocation published 2025-05-02"));

  // Resolution never touches the facts themselves.
  let kept = e.store().get_fact(official.fact_id).await.unwrap().unwrap();
  assert_eq!(kept.value, json!("active"));
}

#[tokio::test]
async fn cascade_leaves_decided_conflicts_alone() {
  let e = engine(prioritised()).await;
  let doc = Uuid::new_v4();
  let fr = e
    .store()
    .register_source(NewSource::new("Federal Register"))
    .await
    .unwrap();

  e.store()
    .store_fact(status_fact(doc, "active").with_source(extracted(fr.source_id)))
    .await
    .unwrap();
  let other = e.store().store_fact(status_fact(doc, "revoked")).await.unwrap();
  let conflict = e.detect_conflicts(doc).await.unwrap().remove(0);

  e.resolve_conflict_manually(
    conflict.conflict_id,
    other.fact_id,
    Some("court order on file".into()),
    "analyst",
  )
  .await
  .unwrap();
  assert!(e.resolve_conflict(conflict.conflict_id).await.unwrap().is_none());

  let kept = e.store().get_conflict(conflict.conflict_id).await.unwrap().unwrap();
  assert_eq!(kept.status, ConflictStatus::ResolvedManual);
  assert_eq!(kept.selected_fact_id, Some(other.fact_id));
  assert_eq!(kept.resolution_by.as_deref(), Some("analyst"));
  assert_eq!(kept.resolution_notes.as_deref(), Some("court order on file"));

  e.flag_conflict(conflict.conflict_id, Some("needs counsel".into()))
    .await
    .unwrap();
  assert!(e.resolve_conflict(conflict.conflict_id).await.unwrap().is_none());

  let kept = e.store().get_conflict(conflict.conflict_id).await.unwrap().unwrap();
  assert_eq!(kept.status, ConflictStatus::Flagged);
  assert!(kept.selected_fact_id.is_none());
  assert!(kept.resolution_by.is_none());
}

#[tokio::test]
async fn manual_resolution_rejects_foreign_fact() {
  let e = engine(EngineConfig::default()).await;
  let doc = Uuid::new_v4();

  e.store().store_fact(status_fact(doc, "active")).await.unwrap();
  e.store().store_fact(status_fact(doc, "revoked")).await.unwrap();
  let conflict = e.detect_conflicts(doc).await.unwrap().remove(0);

  let stranger = Uuid::new_v4();
  let err = e
    .resolve_conflict_manually(conflict.conflict_id, stranger, None, "analyst")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(factum_core::Error::InvalidSelection { fact_id, .. }) if fact_id == stranger
  ));

  let missing = Uuid::new_v4();
  let err = e
    .resolve_conflict_manually(missing, conflict.fact1_id, None, "analyst")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(factum_core::Error::ConflictNotFound(id)) if id == missing
  ));
}

#[tokio::test]
async fn resolving_unknown_conflict_is_not_found() {
  let e = engine(EngineConfig::default()).await;
  let err = e.resolve_conflict(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::Core(factum_core::Error::ConflictNotFound(_))));
}

#[tokio::test]
async fn flagging_escalates_without_a_winner() {
  let e = engine(EngineConfig::default()).await;
  let doc = Uuid::new_v4();

  e.store().store_fact(status_fact(doc, "active")).await.unwrap();
  e.store().store_fact(status_fact(doc, "revoked")).await.unwrap();
  let conflict = e.detect_conflicts(doc).await.unwrap().remove(0);

  let flagged = e
    .flag_conflict(conflict.conflict_id, Some("needs counsel review".into()))
    .await
    .unwrap();
  assert_eq!(flagged.status, ConflictStatus::Flagged);
  assert!(flagged.resolution_strategy.is_none());
  assert!(flagged.selected_fact_id.is_none());
  assert_eq!(flagged.resolution_notes.as_deref(), Some("needs counsel review"));

  assert!(e.get_unresolved_conflicts(Some(doc)).await.unwrap().is_empty());
  assert!(e.flag_conflict(Uuid::new_v4(), None).await.is_err());
}

// ─── Conflict records ────────────────────────────────────────────────────────

#[tokio::test]
async fn store_rejects_duplicate_and_self_pairs() {
  let s = store().await;
  let doc = Uuid::new_v4();
  let a = s.store_fact(status_fact(doc, "active")).await.unwrap();
  let b = s.store_fact(status_fact(doc, "revoked")).await.unwrap();

  let new = |x: Uuid, y: Uuid| NewConflict {
    document_id:   doc,
    conflict_type: FactCategory::Status,
    severity:      Severity::High,
    fact1_id:      x,
    fact2_id:      y,
  };

  assert!(s.insert_conflict(new(a.fact_id, b.fact_id)).await.unwrap().is_some());
  assert!(s.insert_conflict(new(b.fact_id, a.fact_id)).await.unwrap().is_none());

  let err = s.insert_conflict(new(a.fact_id, a.fact_id)).await.unwrap_err();
  assert!(matches!(err, Error::Core(factum_core::Error::SelfConflict(_))));

  assert_eq!(s.get_conflicts_for_document(doc).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unresolved_conflicts_span_documents() {
  let e = engine(EngineConfig::default()).await;
  let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

  for doc in [first, second] {
    e.store().store_fact(status_fact(doc, "active")).await.unwrap();
    e.store().store_fact(status_fact(doc, "revoked")).await.unwrap();
    e.detect_conflicts(doc).await.unwrap();
  }

  assert_eq!(e.get_unresolved_conflicts(None).await.unwrap().len(), 2);
  let only_first = e.get_unresolved_conflicts(Some(first)).await.unwrap();
  assert_eq!(only_first.len(), 1);
  assert_eq!(only_first[0].document_id, first);
}

#[tokio::test]
async fn summary_counts_status_and_severity() {
  let e = engine(EngineConfig::default()).await;
  let doc = Uuid::new_v4();

  e.store().store_fact(status_fact(doc, "active")).await.unwrap();
  e.store().store_fact(status_fact(doc, "revoked")).await.unwrap();
  e.store()
    .store_fact(guidance_fact(doc, "w1 w2 w3 w4 w5 w6 a1 a2"))
    .await
    .unwrap();
  e.store()
    .store_fact(guidance_fact(doc, "w1 w2 w3 w4 w5 w6 b1 b2"))
    .await
    .unwrap();

  let created = e.detect_conflicts(doc).await.unwrap();
  assert_eq!(created.len(), 2);
  let status_conflict = created
    .iter()
    .find(|c| c.conflict_type == FactCategory::Status)
    .unwrap();
  e.flag_conflict(status_conflict.conflict_id, None).await.unwrap();

  let summary = e.conflict_summary(doc).await.unwrap();
  assert_eq!(summary.total, 2);
  assert_eq!(summary.unresolved(), 1);
  assert_eq!(summary.by_status.get("flagged"), Some(&1));
  assert_eq!(summary.by_severity.get(&Severity::High), Some(&1));
  assert_eq!(summary.by_severity.get(&Severity::Medium), Some(&1));
}
