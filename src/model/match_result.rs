//! The final output of a single candidate/job match.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transport::TransportScore;

/// A tag describing a notable condition that affected a match's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Alert {
    SectoralPenalty,
    Overqualification,
    NoModeCompatible,
    TransportDegraded,
}

/// The coarse recommendation bucket derived from `final_score` (spec.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationClass {
    StrongMatch,
    Match,
    WeakMatch,
    NoMatch,
    NoMatchSectoral,
}

/// Provenance/versioning metadata attached to every result, independent of
/// score content, so a cached replay and a live computation can be told
/// apart without touching the score itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineMetadata {
    pub engine_version: String,
    pub computed_at: DateTime<Utc>,
    /// Whether the transport analysis used a live routing/geocoding call
    /// anywhere, or was entirely fallback-derived.
    pub used_live_map_data: bool,
}

/// The final, weighted outcome of scoring one candidate against one job.
///
/// Invariant: `final_score = clamp01(Σ subscore_i · weight_i · Π penalties)`,
/// weights sum to 1 within `1e-6`, `final_score` and `confidence` both lie
/// in `[0,1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub final_score: f64,
    pub confidence: f64,
    pub component_scores: BTreeMap<String, f64>,
    pub weights_used: BTreeMap<String, f64>,
    pub transport_analysis: TransportScore,
    pub alerts: BTreeSet<Alert>,
    pub explanations: Vec<String>,
    pub recommendation_class: RecommendationClass,
    pub engine_metadata: EngineMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alerts_are_ordered_and_deduplicated() {
        let mut alerts = BTreeSet::new();
        alerts.insert(Alert::SectoralPenalty);
        alerts.insert(Alert::SectoralPenalty);
        alerts.insert(Alert::Overqualification);
        assert_eq!(alerts.len(), 2);
    }
}
