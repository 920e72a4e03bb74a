//! [`SqliteStore`] — the SQLite implementation of [`FactStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use factum_core::{
  conflict::{ConflictRecord, FactPair, NewConflict, ResolutionUpdate},
  fact::{Fact, FactReplacement, FactSearch, NewFact, Relationship, clamp_confidence},
  source::{NewSource, Source, SourceSnapshot},
  store::FactStore,
  taxonomy::{ConflictStatus, FactCategory, RelationshipType},
};

use crate::{
  Error, Result,
  encode::{
    CONFLICT_COLUMNS, FACT_COLUMNS, RawAttribution, RawConflict, RawFact,
    RawFactBundle, RawRelationship, RawSource, SOURCE_COLUMNS, encode_dt,
    encode_json, encode_uuid,
  },
  schema::SCHEMA,
};

const RELATIONSHIP_COLUMNS: &str =
  "fact_id, related_fact_id, relationship_type, description, confidence";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Factum store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run raw SQL against the connection.
  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn relationships_where(
    &self,
    column: &'static str,
    fact_id: Uuid,
    relationship_type: Option<RelationshipType>,
  ) -> Result<Vec<Relationship>> {
    let id_str   = encode_uuid(fact_id);
    let type_str = relationship_type.map(|t| t.as_str().to_owned());

    let raws: Vec<RawRelationship> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {RELATIONSHIP_COLUMNS} FROM fact_relationships
           WHERE {column} = ?1
             AND (?2 IS NULL OR relationship_type = ?2)
           ORDER BY rowid"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str, type_str], RawRelationship::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRelationship::into_relationship).collect()
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// These run on the connection thread, inside `call`, and only ever deal in
// raw strings. Decoding happens back on the async side.

fn insert_children(
  conn: &rusqlite::Connection,
  fact_id: &str,
  sources: &[RawAttribution],
  relationships: &[RawRelationship],
) -> rusqlite::Result<()> {
  let mut insert_source = conn.prepare_cached(
    "INSERT INTO fact_sources (
       fact_id, source_id, context, extraction_date, extraction_method, metadata
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
  )?;
  for s in sources {
    insert_source.execute(rusqlite::params![
      fact_id,
      s.source_id,
      s.context,
      s.extraction_date,
      s.extraction_method,
      s.metadata,
    ])?;
  }

  let mut insert_rel = conn.prepare_cached(
    "INSERT INTO fact_relationships (
       fact_id, related_fact_id, relationship_type, description, confidence
     ) VALUES (?1, ?2, ?3, ?4, ?5)",
  )?;
  for r in relationships {
    insert_rel.execute(rusqlite::params![
      fact_id,
      r.related_fact_id,
      r.relationship_type,
      r.description,
      r.confidence,
    ])?;
  }
  Ok(())
}

fn load_children(conn: &rusqlite::Connection, fact: RawFact) -> rusqlite::Result<RawFactBundle> {
  let mut sources_stmt = conn.prepare_cached(
    "SELECT source_id, context, extraction_date, extraction_method, metadata
     FROM fact_sources WHERE fact_id = ?1 ORDER BY rowid",
  )?;
  let sources = sources_stmt
    .query_map(rusqlite::params![fact.fact_id], RawAttribution::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut rels_stmt = conn.prepare_cached(&format!(
    "SELECT {RELATIONSHIP_COLUMNS} FROM fact_relationships WHERE fact_id = ?1 ORDER BY rowid"
  ))?;
  let relationships = rels_stmt
    .query_map(rusqlite::params![fact.fact_id], RawRelationship::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(RawFactBundle { fact, sources, relationships })
}

/// Run a `facts` query and eagerly load each row's attributions and edges.
fn query_bundles<P: rusqlite::Params>(
  conn: &rusqlite::Connection,
  sql: &str,
  params: P,
) -> rusqlite::Result<Vec<RawFactBundle>> {
  let mut stmt = conn.prepare(sql)?;
  let facts = stmt
    .query_map(params, RawFact::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  facts.into_iter().map(|f| load_children(conn, f)).collect()
}

fn query_conflicts<P: rusqlite::Params>(
  conn: &rusqlite::Connection,
  sql: &str,
  params: P,
) -> rusqlite::Result<Vec<RawConflict>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map(params, RawConflict::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn select_conflict(
  conn: &rusqlite::Connection,
  conflict_id: &str,
) -> rusqlite::Result<Option<RawConflict>> {
  conn
    .query_row(
      &format!("SELECT {CONFLICT_COLUMNS} FROM conflicts WHERE conflict_id = ?1"),
      rusqlite::params![conflict_id],
      RawConflict::from_row,
    )
    .optional()
}

fn select_source(
  conn: &rusqlite::Connection,
  source_id: &str,
) -> rusqlite::Result<Option<RawSource>> {
  let mut stmt = conn.prepare_cached(&format!(
    "SELECT {SOURCE_COLUMNS} FROM sources WHERE source_id = ?1"
  ))?;
  stmt
    .query_row(rusqlite::params![source_id], RawSource::from_row)
    .optional()
}

/// `%text%` with LIKE metacharacters escaped by a backslash.
fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

fn decode_bundles(bundles: Vec<RawFactBundle>) -> Result<Vec<Fact>> {
  bundles.into_iter().map(RawFactBundle::into_fact).collect()
}

// ─── FactStore impl ──────────────────────────────────────────────────────────

impl FactStore for SqliteStore {
  type Error = Error;

  // ── Facts ─────────────────────────────────────────────────────────────────

  async fn store_fact(&self, input: NewFact) -> Result<Fact> {
    let fact_id = Uuid::new_v4();
    let now     = Utc::now();
    let fact    = Fact {
      fact_id,
      document_id:   input.document_id,
      category:      input.category,
      value:         input.value,
      confidence:    clamp_confidence(input.confidence),
      created_at:    now,
      updated_at:    now,
      sources:       input.sources,
      relationships: input
        .relationships
        .into_iter()
        .map(|r| r.attach(fact_id))
        .collect(),
    };

    let bundle = RawFactBundle::from_fact(&fact);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let f = &bundle.fact;
        tx.execute(
          &format!("INSERT INTO facts ({FACT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
          rusqlite::params![
            f.fact_id,
            f.document_id,
            f.category,
            f.value_json,
            f.confidence,
            f.created_at,
            f.updated_at,
          ],
        )?;
        insert_children(&tx, &f.fact_id, &bundle.sources, &bundle.relationships)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(
      fact = %fact.fact_id,
      document = %fact.document_id,
      category = %fact.category,
      "fact stored"
    );
    Ok(fact)
  }

  async fn get_facts_for_document(
    &self,
    document_id: Uuid,
    category: Option<FactCategory>,
    min_confidence: f64,
  ) -> Result<Vec<Fact>> {
    let doc_str      = encode_uuid(document_id);
    let category_str = category.map(|c| c.as_str().to_owned());

    let bundles = self
      .conn
      .call(move |conn| {
        Ok(query_bundles(
          conn,
          &format!(
            "SELECT {FACT_COLUMNS} FROM facts
             WHERE document_id = ?1
               AND (?2 IS NULL OR category = ?2)
               AND confidence >= ?3
             ORDER BY rowid"
          ),
          rusqlite::params![doc_str, category_str, min_confidence],
        )?)
      })
      .await?;

    decode_bundles(bundles)
  }

  async fn get_fact(&self, fact_id: Uuid) -> Result<Option<Fact>> {
    let id_str = encode_uuid(fact_id);

    let bundles = self
      .conn
      .call(move |conn| {
        Ok(query_bundles(
          conn,
          &format!("SELECT {FACT_COLUMNS} FROM facts WHERE fact_id = ?1"),
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    bundles.into_iter().next().map(RawFactBundle::into_fact).transpose()
  }

  async fn update_fact(&self, replacement: FactReplacement) -> Result<Fact> {
    let fact_id = replacement.fact_id;
    if fact_id.is_nil() {
      return Err(factum_core::Error::MissingFactId.into());
    }

    let id_str     = encode_uuid(fact_id);
    let value_json = encode_json(&replacement.value);
    let confidence = clamp_confidence(replacement.confidence);
    let at_str     = encode_dt(Utc::now());
    let sources: Vec<RawAttribution> = replacement
      .sources
      .iter()
      .map(RawAttribution::from_attribution)
      .collect();
    let relationships: Vec<RawRelationship> = replacement
      .relationships
      .into_iter()
      .map(|r| RawRelationship::from_relationship(&r.attach(fact_id)))
      .collect();

    let found: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE facts SET value_json = ?2, confidence = ?3, updated_at = ?4
           WHERE fact_id = ?1",
          rusqlite::params![id_str, value_json, confidence, at_str],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        tx.execute("DELETE FROM fact_sources WHERE fact_id = ?1", rusqlite::params![id_str])?;
        tx.execute(
          "DELETE FROM fact_relationships WHERE fact_id = ?1",
          rusqlite::params![id_str],
        )?;
        insert_children(&tx, &id_str, &sources, &relationships)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !found {
      return Err(factum_core::Error::FactNotFound(fact_id).into());
    }

    tracing::debug!(fact = %fact_id, "fact replaced");
    self
      .get_fact(fact_id)
      .await?
      .ok_or(Error::Core(factum_core::Error::FactNotFound(fact_id)))
  }

  async fn search_facts(&self, query: &FactSearch) -> Result<Vec<Fact>> {
    let category_str   = query.category.as_ref().map(|c| c.as_str().to_owned());
    let text_pattern   = query.text.as_deref().map(like_pattern);
    let min_confidence = query.min_confidence;
    let limit_val      = i64::try_from(query.limit).unwrap_or(i64::MAX);

    let bundles = self
      .conn
      .call(move |conn| {
        Ok(query_bundles(
          conn,
          &format!(
            "SELECT {FACT_COLUMNS} FROM facts
             WHERE (?1 IS NULL OR category = ?1)
               AND (?2 IS NULL OR value_json LIKE ?2 ESCAPE '\\')
               AND confidence >= ?3
             ORDER BY rowid
             LIMIT ?4"
          ),
          rusqlite::params![category_str, text_pattern, min_confidence, limit_val],
        )?)
      })
      .await?;

    decode_bundles(bundles)
  }

  // ── Relationship graph ────────────────────────────────────────────────────

  async fn find_contradictions(&self, document_id: Uuid) -> Result<Vec<Relationship>> {
    let doc_str  = encode_uuid(document_id);
    let type_str = RelationshipType::Contradicts.as_str().to_owned();

    let raws: Vec<RawRelationship> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.fact_id, r.related_fact_id, r.relationship_type,
                  r.description, r.confidence
           FROM fact_relationships r
           JOIN facts a ON a.fact_id = r.fact_id
           JOIN facts b ON b.fact_id = r.related_fact_id
           WHERE r.relationship_type = ?2
             AND a.document_id = ?1
             AND b.document_id = ?1
           ORDER BY r.rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![doc_str, type_str], RawRelationship::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRelationship::into_relationship).collect()
  }

  async fn relationships_from(
    &self,
    fact_id: Uuid,
    relationship_type: Option<RelationshipType>,
  ) -> Result<Vec<Relationship>> {
    self.relationships_where("fact_id", fact_id, relationship_type).await
  }

  async fn relationships_to(
    &self,
    fact_id: Uuid,
    relationship_type: Option<RelationshipType>,
  ) -> Result<Vec<Relationship>> {
    self.relationships_where("related_fact_id", fact_id, relationship_type).await
  }

  // ── Source registry ───────────────────────────────────────────────────────

  async fn register_source(&self, input: NewSource) -> Result<Source> {
    let source = Source {
      source_id:    Uuid::new_v4(),
      name:         input.name,
      authority:    input.authority,
      last_updated: input.last_updated,
      metadata:     input.metadata,
    };

    let id_str        = encode_uuid(source.source_id);
    let name          = source.name.clone();
    let authority     = source.authority.clone();
    let updated_str   = source.last_updated.map(encode_dt);
    let metadata_str  = encode_json(&source.metadata);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT INTO sources ({SOURCE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
          rusqlite::params![id_str, name, authority, updated_str, metadata_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(source = %source.source_id, name = %source.name, "source registered");
    Ok(source)
  }

  async fn update_source_timestamp(
    &self,
    source_id: Uuid,
    last_updated: DateTime<Utc>,
  ) -> Result<Option<Source>> {
    let id_str = encode_uuid(source_id);
    let at_str = encode_dt(last_updated);

    let raw: Option<RawSource> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE sources SET last_updated = ?2 WHERE source_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_source(conn, &id_str)?)
      })
      .await?;

    raw.map(RawSource::into_source).transpose()
  }

  async fn get_sources(&self, source_ids: Vec<Uuid>) -> Result<SourceSnapshot> {
    let id_strs: Vec<String> = source_ids.into_iter().map(encode_uuid).collect();

    let raws: Vec<RawSource> = self
      .conn
      .call(move |conn| {
        let mut found = Vec::with_capacity(id_strs.len());
        for id in &id_strs {
          if let Some(raw) = select_source(conn, id)? {
            found.push(raw);
          }
        }
        Ok(found)
      })
      .await?;

    raws.into_iter().map(RawSource::into_source).collect()
  }

  // ── Conflict records ──────────────────────────────────────────────────────

  async fn insert_conflict(&self, input: NewConflict) -> Result<Option<ConflictRecord>> {
    let pair = FactPair::new(input.fact1_id, input.fact2_id)?;

    let record = ConflictRecord {
      conflict_id:         Uuid::new_v4(),
      document_id:         input.document_id,
      conflict_type:       input.conflict_type,
      severity:            input.severity,
      fact1_id:            input.fact1_id,
      fact2_id:            input.fact2_id,
      detection_date:      Utc::now(),
      status:              ConflictStatus::Unresolved,
      resolution_strategy: None,
      selected_fact_id:    None,
      resolution_date:     None,
      resolution_by:       None,
      resolution_notes:    None,
    };

    let raw      = RawConflict::from_conflict(&record);
    let low_str  = encode_uuid(pair.low());
    let high_str = encode_uuid(pair.high());

    let changed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          &format!(
            "INSERT INTO conflicts ({CONFLICT_COLUMNS}, pair_low, pair_high)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT (pair_low, pair_high) DO NOTHING"
          ),
          rusqlite::params![
            raw.conflict_id,
            raw.document_id,
            raw.conflict_type,
            raw.severity,
            raw.fact1_id,
            raw.fact2_id,
            raw.detection_date,
            raw.status,
            raw.resolution_strategy,
            raw.selected_fact_id,
            raw.resolution_date,
            raw.resolution_by,
            raw.resolution_notes,
            low_str,
            high_str,
          ],
        )?;
        Ok(n)
      })
      .await?;

    Ok((changed == 1).then_some(record))
  }

  async fn get_conflict(&self, conflict_id: Uuid) -> Result<Option<ConflictRecord>> {
    let id_str = encode_uuid(conflict_id);

    let raw = self
      .conn
      .call(move |conn| Ok(select_conflict(conn, &id_str)?))
      .await?;

    raw.map(RawConflict::into_conflict).transpose()
  }

  async fn get_conflicts_for_document(&self, document_id: Uuid) -> Result<Vec<ConflictRecord>> {
    let doc_str = encode_uuid(document_id);

    let raws = self
      .conn
      .call(move |conn| {
        Ok(query_conflicts(
          conn,
          &format!(
            "SELECT {CONFLICT_COLUMNS} FROM conflicts
             WHERE document_id = ?1
             ORDER BY rowid"
          ),
          rusqlite::params![doc_str],
        )?)
      })
      .await?;

    raws.into_iter().map(RawConflict::into_conflict).collect()
  }

  async fn get_unresolved_conflicts(
    &self,
    document_id: Option<Uuid>,
  ) -> Result<Vec<ConflictRecord>> {
    let doc_str    = document_id.map(encode_uuid);
    let status_str = ConflictStatus::Unresolved.as_str().to_owned();

    let raws = self
      .conn
      .call(move |conn| {
        Ok(query_conflicts(
          conn,
          &format!(
            "SELECT {CONFLICT_COLUMNS} FROM conflicts
             WHERE status = ?2
               AND (?1 IS NULL OR document_id = ?1)
             ORDER BY rowid"
          ),
          rusqlite::params![doc_str, status_str],
        )?)
      })
      .await?;

    raws.into_iter().map(RawConflict::into_conflict).collect()
  }

  async fn record_resolution(
    &self,
    conflict_id: Uuid,
    update: ResolutionUpdate,
  ) -> Result<Option<ConflictRecord>> {
    let id_str       = encode_uuid(conflict_id);
    let status_str   = update.status.as_str().to_owned();
    let strategy_str = update.strategy.as_ref().map(|s| s.as_str().to_owned());
    let selected_str = update.selected_fact_id.map(encode_uuid);
    let at_str       = encode_dt(update.resolved_at);
    let by           = update.resolved_by;
    let notes        = update.notes;

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE conflicts SET
             status              = ?2,
             resolution_strategy = ?3,
             selected_fact_id    = ?4,
             resolution_date     = ?5,
             resolution_by       = ?6,
             resolution_notes    = ?7
           WHERE conflict_id = ?1",
          rusqlite::params![id_str, status_str, strategy_str, selected_str, at_str, by, notes],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        let raw = select_conflict(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawConflict::into_conflict).transpose()
  }
}

#[cfg(test)]
mod tests {
  use super::like_pattern;

  #[test]
  fn like_pattern_escapes_metacharacters() {
    assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    assert_eq!(like_pattern("plain"), "%plain%");
  }
}
