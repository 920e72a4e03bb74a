//! SQL schema for the Factum SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS facts (
    fact_id      TEXT PRIMARY KEY,
    document_id  TEXT NOT NULL,
    category     TEXT NOT NULL,   -- FactCategory tag; open set
    value_json   TEXT NOT NULL,   -- category-dependent JSON payload
    confidence   REAL NOT NULL,
    created_at   TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    updated_at   TEXT NOT NULL
);

-- Provenance. Replaced wholesale whenever the owning fact is updated.
CREATE TABLE IF NOT EXISTS fact_sources (
    fact_id           TEXT NOT NULL REFERENCES facts(fact_id),
    source_id         TEXT NOT NULL,  -- registry key; not enforced
    context           TEXT,
    extraction_date   TEXT NOT NULL,
    extraction_method TEXT NOT NULL,
    metadata          TEXT NOT NULL DEFAULT 'null'
);

-- Directed, typed edges. Cycles are allowed; the far end may live in
-- another document or not be stored yet.
CREATE TABLE IF NOT EXISTS fact_relationships (
    fact_id           TEXT NOT NULL REFERENCES facts(fact_id),
    related_fact_id   TEXT NOT NULL,
    relationship_type TEXT NOT NULL,
    description       TEXT,
    confidence        REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS sources (
    source_id    TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    authority    TEXT,
    last_updated TEXT,
    metadata     TEXT NOT NULL DEFAULT 'null'
);

-- Conflict records are never deleted. `pair_low`/`pair_high` hold the
-- normalised unordered pair so that one pair has at most one record.
CREATE TABLE IF NOT EXISTS conflicts (
    conflict_id         TEXT PRIMARY KEY,
    document_id         TEXT NOT NULL,
    conflict_type       TEXT NOT NULL,
    severity            TEXT NOT NULL,   -- 'high' | 'medium' | 'low'
    fact1_id            TEXT NOT NULL REFERENCES facts(fact_id),
    fact2_id            TEXT NOT NULL REFERENCES facts(fact_id),
    pair_low            TEXT NOT NULL,
    pair_high           TEXT NOT NULL,
    detection_date      TEXT NOT NULL,
    status              TEXT NOT NULL DEFAULT 'unresolved',
    resolution_strategy TEXT,
    selected_fact_id    TEXT,
    resolution_date     TEXT,
    resolution_by       TEXT,
    resolution_notes    TEXT,
    UNIQUE (pair_low, pair_high),
    CHECK  (fact1_id != fact2_id),
    CHECK  (pair_low < pair_high)
);

CREATE INDEX IF NOT EXISTS facts_document_idx      ON facts(document_id, category);
CREATE INDEX IF NOT EXISTS fact_sources_fact_idx   ON fact_sources(fact_id);
CREATE INDEX IF NOT EXISTS fact_rel_fact_idx       ON fact_relationships(fact_id);
CREATE INDEX IF NOT EXISTS fact_rel_related_idx    ON fact_relationships(related_fact_id);
CREATE INDEX IF NOT EXISTS conflicts_document_idx  ON conflicts(document_id);
CREATE INDEX IF NOT EXISTS conflicts_status_idx    ON conflicts(status);

PRAGMA user_version = 1;
";
