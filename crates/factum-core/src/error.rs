//! Error types for `factum-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("fact not found: {0}")]
  FactNotFound(Uuid),

  #[error("conflict not found: {0}")]
  ConflictNotFound(Uuid),

  /// `update_fact` was called with a nil fact id.
  #[error("fact update requires a fact id")]
  MissingFactId,

  #[error("fact {fact_id} is not part of conflict {conflict_id}")]
  InvalidSelection { conflict_id: Uuid, fact_id: Uuid },

  #[error("a fact cannot conflict with itself: {0}")]
  SelfConflict(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
