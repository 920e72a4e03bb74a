//! Engine configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock policy. Values load from an optional TOML file layered under
//! `FACTUM__*` environment variables, e.g.
//! `FACTUM__AUTO_RESOLVE__MAX_SEVERITY=medium`.
//!
//! ```toml
//! [auto_resolve]
//! enabled      = true
//! max_severity = "low"
//!
//! [detection]
//! guidance_min_similarity = 0.5
//! guidance_max_similarity = 0.8
//!
//! [resolution.source_priorities]
//! "Federal Register" = 10
//! ```

use std::{
  collections::{BTreeMap, HashMap},
  path::Path,
};

use serde::{Deserialize, Deserializer};

use crate::{Result, conflict::Severity};

/// Which newly detected conflicts the detector hands straight to the
/// resolution cascade.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutoResolvePolicy {
  pub enabled:      bool,
  /// Conflicts at or below this severity are auto-resolved; anything above
  /// is left for a human regardless of whether a strategy could decide it.
  pub max_severity: Severity,
}

impl Default for AutoResolvePolicy {
  fn default() -> Self {
    Self {
      enabled:      true,
      max_severity: Severity::Low,
    }
  }
}

impl AutoResolvePolicy {
  pub fn admits(&self, severity: Severity) -> bool {
    self.enabled && severity <= self.max_severity
  }
}

/// Thresholds used by the per-category conflict predicates.
///
/// The similarity values are heuristics that have not been calibrated
/// against real extraction data.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionThresholds {
  /// Two dates (or deadlines) closer than this are considered equal.
  pub date_tolerance_hours:    i64,
  pub requirement_similarity:  f64,
  pub impact_similarity:       f64,
  /// Guidance below this similarity is about something else.
  pub guidance_min_similarity: f64,
  /// Guidance above this similarity is a restatement.
  pub guidance_max_similarity: f64,
}

impl Default for DetectionThresholds {
  fn default() -> Self {
    Self {
      date_tolerance_hours:    24,
      requirement_similarity:  0.70,
      impact_similarity:       0.60,
      guidance_min_similarity: 0.50,
      guidance_max_similarity: 0.80,
    }
  }
}

/// Parameters of the resolution cascade.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolutionSettings {
  /// Minimum gap for the newest-source and extraction-recency strategies.
  pub recency_threshold_hours: i64,
  /// Minimum confidence gap for the confidence strategy.
  pub confidence_margin:       f64,
  /// Priority of any source missing from `source_priorities`.
  pub default_source_priority: u32,
  /// Priority by source name, keyed by the trimmed, lower-cased name.
  #[serde(deserialize_with = "normalised_priorities")]
  pub source_priorities:       HashMap<String, u32>,
}

impl Default for ResolutionSettings {
  fn default() -> Self {
    Self {
      recency_threshold_hours: 24,
      confidence_margin:       0.10,
      default_source_priority: 1,
      source_priorities:       HashMap::new(),
    }
  }
}

impl ResolutionSettings {
  /// Set the priority of a source. Names differing only in case or
  /// surrounding whitespace share one entry; the last call wins.
  pub fn with_priority(mut self, name: impl AsRef<str>, priority: u32) -> Self {
    self.source_priorities.insert(priority_key(name.as_ref()), priority);
    self
  }

  /// The configured priority of a source, by name, ignoring case.
  pub fn priority_of(&self, name: &str) -> u32 {
    self
      .source_priorities
      .get(&priority_key(name))
      .copied()
      .unwrap_or(self.default_source_priority)
  }
}

fn priority_key(name: &str) -> String { name.trim().to_lowercase() }

/// Deserialise the priority table with normalised keys. Colliding keys are
/// folded in sorted order, so the outcome does not depend on hashing.
fn normalised_priorities<'de, D>(d: D) -> Result<HashMap<String, u32>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = BTreeMap::<String, u32>::deserialize(d)?;
  Ok(raw.into_iter().map(|(k, v)| (priority_key(&k), v)).collect())
}

/// Top-level configuration for [`crate::engine::ConflictEngine`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub auto_resolve: AutoResolvePolicy,
  pub detection:    DetectionThresholds,
  pub resolution:   ResolutionSettings,
}

impl EngineConfig {
  /// Load from an optional TOML file, overridden by `FACTUM__*` environment
  /// variables. A missing file is not an error.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
      builder = builder.add_source(config::File::from(path).required(false));
    }
    let settings = builder
      .add_source(
        config::Environment::with_prefix("FACTUM")
          .prefix_separator("__")
          .separator("__"),
      )
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  /// Parse a TOML document directly.
  pub fn from_toml_str(toml: &str) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()?;
    Ok(settings.try_deserialize()?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_stock_policy() {
    let cfg = EngineConfig::default();
    assert!(cfg.auto_resolve.enabled);
    assert_eq!(cfg.auto_resolve.max_severity, Severity::Low);
    assert_eq!(cfg.detection.date_tolerance_hours, 24);
    assert_eq!(cfg.detection.requirement_similarity, 0.70);
    assert_eq!(cfg.detection.impact_similarity, 0.60);
    assert_eq!(cfg.resolution.confidence_margin, 0.10);
    assert_eq!(cfg.resolution.default_source_priority, 1);
  }

  #[test]
  fn severity_gate() {
    let policy = AutoResolvePolicy::default();
    assert!(policy.admits(Severity::Low));
    assert!(!policy.admits(Severity::Medium));
    assert!(!policy.admits(Severity::High));

    let off = AutoResolvePolicy { enabled: false, ..Default::default() };
    assert!(!off.admits(Severity::Low));

    let wide = AutoResolvePolicy { enabled: true, max_severity: Severity::Medium };
    assert!(wide.admits(Severity::Medium));
    assert!(!wide.admits(Severity::High));
  }

  #[test]
  fn toml_overrides_and_keeps_defaults() {
    let cfg = EngineConfig::from_toml_str(
      r#"
        [auto_resolve]
        max_severity = "medium"

        [detection]
        guidance_max_similarity = 0.9

        [resolution.source_priorities]
        "Federal Register" = 10
        agency_feed = 5
      "#,
    )
    .unwrap();

    assert!(cfg.auto_resolve.enabled);
    assert_eq!(cfg.auto_resolve.max_severity, Severity::Medium);
    assert_eq!(cfg.detection.guidance_max_similarity, 0.9);
    assert_eq!(cfg.detection.guidance_min_similarity, 0.50);
    assert_eq!(cfg.resolution.priority_of("Federal Register"), 10);
    assert_eq!(cfg.resolution.priority_of("AGENCY_FEED"), 5);
    assert_eq!(cfg.resolution.priority_of("blog"), 1);
  }

  #[test]
  fn empty_document_is_default() {
    let cfg = EngineConfig::from_toml_str("").unwrap();
    assert!(cfg.auto_resolve.enabled);
    assert!(cfg.resolution.source_priorities.is_empty());
  }

  #[test]
  fn priority_lookup_is_case_insensitive() {
    let settings = ResolutionSettings::default().with_priority("Federal Register", 10);
    assert_eq!(settings.priority_of("federal register"), 10);
    assert_eq!(settings.priority_of(" Federal Register "), 10);
    assert_eq!(settings.priority_of("Unknown"), 1);
  }

  #[test]
  fn names_differing_in_case_share_one_priority() {
    let settings = ResolutionSettings::default()
      .with_priority("Federal Register", 10)
      .with_priority("FEDERAL REGISTER ", 3);
    assert_eq!(settings.source_priorities.len(), 1);
    assert_eq!(settings.priority_of("federal register"), 3);

    for _ in 0..8 {
      let settings = ResolutionSettings::default()
        .with_priority("Agency Feed", 7)
        .with_priority("agency feed", 2);
      assert_eq!(settings.priority_of("Agency Feed"), 2);
    }
  }

  #[test]
  fn deserialised_priority_keys_are_normalised() {
    let cfg = EngineConfig::from_toml_str(
      r#"
        [resolution.source_priorities]
        "  Agency Feed " = 4
      "#,
    )
    .unwrap();
    assert!(cfg.resolution.source_priorities.contains_key("agency feed"));
    assert_eq!(cfg.resolution.priority_of("AGENCY FEED"), 4);
  }
}
