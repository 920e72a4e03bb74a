//! The resolution cascade.
//!
//! Given two conflicting facts and a snapshot of the source registry,
//! [`ResolutionEngine::resolve`] tries each strategy in a fixed order and
//! returns the first decision:
//!
//! 1. source priority: the fact backed by the higher-priority source;
//! 2. newest source: the fact whose newest source was updated later;
//! 3. extraction recency: the fact extracted more recently;
//! 4. confidence: the fact with clearly higher confidence.
//!
//! Each strategy either decides or abstains; none of them look at facts other
//! than the two in question. Facts are never modified here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  config::ResolutionSettings,
  fact::Fact,
  source::SourceSnapshot,
  taxonomy::ResolutionStrategy,
};

/// The order in which strategies are consulted.
pub const STRATEGY_ORDER: [ResolutionStrategy; 4] = [
  ResolutionStrategy::SourcePriority,
  ResolutionStrategy::NewestSource,
  ResolutionStrategy::ExtractionRecency,
  ResolutionStrategy::Confidence,
];

/// A decision in favour of one of two conflicting facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
  pub strategy:         ResolutionStrategy,
  pub selected_fact_id: Uuid,
  pub rejected_fact_id: Uuid,
  /// Human-readable account of why the selected fact won.
  pub rationale:        String,
}

/// Which side of a pair a strategy picked.
enum Pick {
  First,
  Second,
}

/// Runs the resolution strategies against a pair of facts.
#[derive(Debug, Clone, Default)]
pub struct ResolutionEngine {
  settings: ResolutionSettings,
}

impl ResolutionEngine {
  pub fn new(settings: ResolutionSettings) -> Self { Self { settings } }

  pub fn settings(&self) -> &ResolutionSettings { &self.settings }

  /// Try every strategy in [`STRATEGY_ORDER`]; `None` if none decides.
  pub fn resolve(
    &self,
    a: &Fact,
    b: &Fact,
    sources: &SourceSnapshot,
  ) -> Option<Resolution> {
    STRATEGY_ORDER
      .iter()
      .find_map(|strategy| self.apply(strategy, a, b, sources))
  }

  /// Run a single strategy.
  pub fn apply(
    &self,
    strategy: &ResolutionStrategy,
    a: &Fact,
    b: &Fact,
    sources: &SourceSnapshot,
  ) -> Option<Resolution> {
    let (pick, rationale) = match strategy {
      ResolutionStrategy::SourcePriority => self.by_source_priority(a, b, sources),
      ResolutionStrategy::NewestSource => self.by_newest_source(a, b, sources),
      ResolutionStrategy::ExtractionRecency => self.by_extraction_recency(a, b),
      ResolutionStrategy::Confidence => self.by_confidence(a, b),
      ResolutionStrategy::Manual | ResolutionStrategy::Other(_) => None,
    }?;

    let (selected, rejected) = match pick {
      Pick::First => (a, b),
      Pick::Second => (b, a),
    };
    tracing::debug!(
      strategy = %strategy,
      selected = %selected.fact_id,
      rejected = %rejected.fact_id,
      "resolution strategy decided"
    );
    Some(Resolution {
      strategy: strategy.clone(),
      selected_fact_id: selected.fact_id,
      rejected_fact_id: rejected.fact_id,
      rationale,
    })
  }

  // ── Strategies ──────────────────────────────────────────────────────────

  /// The highest configured priority among a fact's attributed sources.
  pub fn max_source_priority(&self, fact: &Fact, sources: &SourceSnapshot) -> u32 {
    fact
      .sources
      .iter()
      .map(|attr| {
        sources
          .get(&attr.source_id)
          .map(|s| self.settings.priority_of(&s.name))
          .unwrap_or(self.settings.default_source_priority)
      })
      .max()
      .unwrap_or(self.settings.default_source_priority)
  }

  fn by_source_priority(
    &self,
    a: &Fact,
    b: &Fact,
    sources: &SourceSnapshot,
  ) -> Option<(Pick, String)> {
    let pa = self.max_source_priority(a, sources);
    let pb = self.max_source_priority(b, sources);
    let pick = match pa.cmp(&pb) {
      std::cmp::Ordering::Greater => Pick::First,
      std::cmp::Ordering::Less => Pick::Second,
      std::cmp::Ordering::Equal => return None,
    };
    Some((
      pick,
      format!(
        "source priority {} beats {}",
        pa.max(pb),
        pa.min(pb)
      ),
    ))
  }

  fn newest_source(fact: &Fact, sources: &SourceSnapshot) -> Option<DateTime<Utc>> {
    fact
      .sources
      .iter()
      .filter_map(|attr| sources.get(&attr.source_id)?.last_updated)
      .max()
  }

  fn by_newest_source(
    &self,
    a: &Fact,
    b: &Fact,
    sources: &SourceSnapshot,
  ) -> Option<(Pick, String)> {
    let ta = Self::newest_source(a, sources)?;
    let tb = Self::newest_source(b, sources)?;
    let pick = self.later(ta, tb)?;
    Some((
      pick,
      format!("source updated {} is newer than {}", ta.max(tb), ta.min(tb)),
    ))
  }

  fn by_extraction_recency(&self, a: &Fact, b: &Fact) -> Option<(Pick, String)> {
    let ta = a.latest_extraction()?;
    let tb = b.latest_extraction()?;
    let pick = self.later(ta, tb)?;
    Some((
      pick,
      format!("extracted {} is more recent than {}", ta.max(tb), ta.min(tb)),
    ))
  }

  fn by_confidence(&self, a: &Fact, b: &Fact) -> Option<(Pick, String)> {
    let gap = a.confidence - b.confidence;
    if gap.abs() <= self.settings.confidence_margin {
      return None;
    }
    let pick = if gap > 0.0 { Pick::First } else { Pick::Second };
    Some((
      pick,
      format!(
        "confidence {:.2} exceeds {:.2}",
        a.confidence.max(b.confidence),
        a.confidence.min(b.confidence)
      ),
    ))
  }

  /// The later of two timestamps, if they are far enough apart to matter.
  fn later(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> Option<Pick> {
    if (a - b).abs() <= Duration::hours(self.settings.recency_threshold_hours) {
      return None;
    }
    Some(if a > b { Pick::First } else { Pick::Second })
  }
}
