//! Integration tests for `SqliteStore`, alone and driven by the conflict
//! engine, against an in-memory database.

mod conflicts;

use chrono::{DateTime, TimeZone as _, Utc};
use factum_core::{
  ConflictEngine, EngineConfig,
  fact::{NewFact, SourceAttribution},
  taxonomy::FactCategory,
};
use serde_json::json;
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn engine(config: EngineConfig) -> ConflictEngine<SqliteStore> {
  ConflictEngine::new(store().await, config)
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn extracted(source_id: Uuid) -> SourceAttribution {
  SourceAttribution::new(source_id, at(2025, 3, 1), "llm")
}

fn date_fact(document_id: Uuid, kind: &str, date: &str) -> NewFact {
  NewFact::new(document_id, FactCategory::Date, json!({ "type": kind, "date": date }))
}

fn status_fact(document_id: Uuid, status: &str) -> NewFact {
  NewFact::new(document_id, FactCategory::Status, json!(status))
}
