//! Open, string-backed taxonomies.
//!
//! Fact categories, relationship types, resolution strategies, and conflict
//! statuses are open to extension: a value outside the known set is kept
//! verbatim in an `Other` variant and reported through `tracing::warn!`
//! rather than rejected. Producers can introduce a new category without a
//! schema change blocking ingestion.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! open_enum {
  (
    $(#[$meta:meta])*
    $name:ident ($what:literal) {
      $( $(#[$vmeta:meta])* $variant:ident => $tag:literal, )+
    }
  ) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    )]
    #[serde(from = "String", into = "String")]
    pub enum $name {
      $( $(#[$vmeta])* $variant, )+
      /// A value outside the known taxonomy, kept as written.
      Other(String),
    }

    impl $name {
      /// Every recognised tag, in declaration order.
      pub const KNOWN: &'static [&'static str] = &[$($tag),+];

      /// The tag stored in the database and used on the wire.
      pub fn as_str(&self) -> &str {
        match self {
          $( Self::$variant => $tag, )+
          Self::Other(raw) => raw.as_str(),
        }
      }

      /// Lenient, case-insensitive parse. Unknown values are kept, trimmed and
      /// lower-cased like the known tags, and logged.
      pub fn parse(raw: &str) -> Self {
        let tag = raw.trim().to_lowercase();
        $( if tag == $tag { return Self::$variant; } )+
        tracing::warn!(
          taxonomy = $what,
          value = tag.as_str(),
          "unrecognised {} value; keeping it",
          $what
        );
        Self::Other(tag)
      }

      pub fn is_known(&self) -> bool { !matches!(self, Self::Other(_)) }
    }

    impl From<String> for $name {
      fn from(raw: String) -> Self { Self::parse(&raw) }
    }

    impl From<&str> for $name {
      fn from(raw: &str) -> Self { Self::parse(raw) }
    }

    impl From<$name> for String {
      fn from(v: $name) -> Self { v.as_str().to_owned() }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }
  };
}

open_enum! {
  /// What kind of claim a fact makes. Determines the payload shape and which
  /// conflict predicate applies.
  FactCategory ("fact category") {
    Date => "date",
    Requirement => "requirement",
    Impact => "impact",
    Entity => "entity",
    Definition => "definition",
    Exemption => "exemption",
    Authority => "authority",
    Amendment => "amendment",
    Status => "status",
    Guidance => "guidance",
  }
}

open_enum! {
  /// The type of a directed edge between two facts.
  RelationshipType ("relationship type") {
    Supports => "supports",
    /// An author-asserted contradiction; unrelated to detected conflicts.
    Contradicts => "contradicts",
    Refines => "refines",
    Supersedes => "supersedes",
    DependsOn => "depends_on",
    RelatesTo => "relates_to",
    ExemptsFrom => "exempts_from",
    Implements => "implements",
    Affects => "affects",
  }
}

open_enum! {
  /// The policy that selected the winning fact of a resolved conflict.
  ResolutionStrategy ("resolution strategy") {
    SourcePriority => "source_priority",
    NewestSource => "newest_source",
    ExtractionRecency => "extraction_recency",
    Confidence => "confidence",
    Manual => "manual",
  }
}

open_enum! {
  /// Lifecycle state of a conflict record.
  ConflictStatus ("conflict status") {
    Unresolved => "unresolved",
    ResolvedAuto => "resolved_auto",
    ResolvedManual => "resolved_manual",
    Flagged => "flagged",
  }
}

impl ConflictStatus {
  pub fn is_resolved(&self) -> bool {
    matches!(self, Self::ResolvedAuto | Self::ResolvedManual)
  }
}
