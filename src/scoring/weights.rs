//! Adaptive weighting (spec.md §4.8): turns the base weight vector into a
//! per-match vector as a function of the candidate's listening reason,
//! experience depth, and whether a motivations subscore is available.
//!
//! Per spec.md §9's open-question resolution: every adjustment (including
//! the motivations-unavailable redistribution) is applied to the base
//! vector first; the vector is renormalized exactly once at the end, never
//! between individual adjustments.

use std::collections::BTreeMap;

use crate::config::WeighterConfig;
use crate::model::candidate::{CandidateProfile, ListeningReason};

/// A candidate is treated as having "many detailed experiences" (spec.md
/// §4.8) when their parsed skill list is at least this long — the upstream
/// profile parser is out of scope, so skill-list depth is the only signal
/// available to the core about how much experience detail was captured.
const MANY_EXPERIENCES_SKILL_THRESHOLD: usize = 8;

const SEMANTIC: &str = "semantic";
const HIERARCHICAL: &str = "hierarchical";
const COMPENSATION: &str = "compensation";
const EXPERIENCE: &str = "experience";
const LOCATION: &str = "location";
const SECTOR: &str = "sector";
const MOTIVATIONS: &str = "motivations";

/// Produces the normalized weight vector for one match.
pub struct AdaptiveWeighter<'a> {
    config: &'a WeighterConfig,
}

impl<'a> AdaptiveWeighter<'a> {
    pub fn new(config: &'a WeighterConfig) -> Self {
        AdaptiveWeighter { config }
    }

    /// `motivations_available` should reflect whether the motivations
    /// subscore cleared [`WeighterConfig::motivations_confidence_threshold`]
    /// — callers compute that once and pass it in, rather than this
    /// function re-deriving it, so the same threshold decision drives both
    /// the weight vector and whether [`crate::scoring::engine::MatchEngine`]
    /// includes the motivations term in the weighted sum.
    pub fn weights_for(&self, candidate: &CandidateProfile, motivations_available: bool) -> BTreeMap<String, f64> {
        let mut weights: BTreeMap<String, f64> = self.config.base_weights.iter().map(|(k, v)| (k.clone(), *v)).collect();

        let mut adjust = |component: &str, delta: f64| {
            if let Some(w) = weights.get_mut(component) {
                *w += delta;
            }
        };

        match candidate.listening_reason {
            ListeningReason::RelocationDistance => {
                adjust(LOCATION, 0.05);
                adjust(SEMANTIC, -0.05);
            }
            ListeningReason::Compensation => {
                adjust(COMPENSATION, 0.05);
                adjust(SEMANTIC, -0.05);
            }
            ListeningReason::CareerGrowth => {
                adjust(MOTIVATIONS, 0.04);
                adjust(SEMANTIC, -0.04);
            }
            ListeningReason::Stability | ListeningReason::Unknown => {}
        }

        if candidate.skills.len() >= MANY_EXPERIENCES_SKILL_THRESHOLD {
            adjust(EXPERIENCE, 0.03);
            adjust(SEMANTIC, -0.03);
        }

        if !motivations_available {
            if let Some(motivations_weight) = weights.remove(MOTIVATIONS) {
                let rest_total: f64 = weights.values().sum();
                if rest_total > 0.0 {
                    for w in weights.values_mut() {
                        *w += motivations_weight * (*w / rest_total);
                    }
                }
            }
        }

        let total: f64 = weights.values().sum();
        if total > 0.0 {
            for w in weights.values_mut() {
                *w /= total;
            }
        }

        weights
    }
}
