//! Candidate profile and mobility constraints.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::route::TransportMode;
use super::HierarchicalLevel;

/// Opaque candidate identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub Uuid);

impl CandidateId {
    /// Generate a fresh, random candidate id.
    pub fn new() -> Self {
        CandidateId(Uuid::new_v4())
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the candidate is listening to new opportunities.
///
/// This drives [`crate::scoring::weights::AdaptiveWeighter`] adjustments.
/// `Unknown` is a distinct tag from "no adjustment wanted" — it means the
/// upstream profile simply never populated this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListeningReason {
    RelocationDistance,
    Compensation,
    CareerGrowth,
    Stability,
    Unknown,
}

/// Per-mode maximum acceptable commute time, remote tolerance, and
/// schedule flexibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobilityConstraints {
    /// Transport modes the candidate is willing to use at all.
    pub accepted_modes: Vec<TransportMode>,
    /// Per-mode ceiling on acceptable one-way commute time, in minutes.
    pub max_minutes_by_mode: HashMap<TransportMode, u32>,
    /// How many remote days per week (0-5) the candidate would accept.
    pub remote_days_acceptable: u8,
    /// Whether the candidate has schedule flexibility (can shift around
    /// rush hour).
    pub flexible_hours: bool,
}

impl MobilityConstraints {
    /// The candidate's ceiling for `mode`, if they accept it at all.
    pub fn max_minutes_for(&self, mode: TransportMode) -> Option<u32> {
        if !self.accepted_modes.contains(&mode) {
            return None;
        }
        self.max_minutes_by_mode.get(&mode).copied()
    }
}

/// A parsed candidate profile, immutable after construction.
///
/// One instance is scored against many jobs; no scorer mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: CandidateId,
    /// Ordered set of skills, most-relevant-first per the upstream parser.
    pub skills: Vec<String>,
    pub years_of_experience: u32,
    pub level: HierarchicalLevel,
    /// Currently-earned compensation, if known.
    pub current_compensation: Option<u32>,
    /// Compensation the candidate expects from a new role.
    pub expected_compensation: Option<u32>,
    pub sector: String,
    pub home_address: String,
    pub mobility: MobilityConstraints,
    pub listening_reason: ListeningReason,
    /// Confidence, in [0,1], that `listening_reason` reflects genuine
    /// evidence about motivation rather than a default. Feeds the
    /// "motivations" component in `AdaptiveWeighter`/`ComponentScorers`.
    pub motivations_confidence: Option<f64>,
}
