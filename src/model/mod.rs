//! Core data model.
//!
//! Every optional attribute that the upstream profile parser might omit is
//! represented with `Option<T>` or an explicit "unknown" tag rather than a
//! silent default, per the "dynamic profile schemas" redesign note: the
//! engine should know the difference between "candidate has no preference"
//! and "upstream never told us".

pub mod candidate;
pub mod geocode;
pub mod job;
pub mod match_result;
pub mod route;
pub mod service_health;

pub use candidate::{CandidateId, CandidateProfile, ListeningReason, MobilityConstraints};
pub use geocode::{GeocodeResult, QualityTier};
pub use job::{JobId, JobRequirement, RemotePolicy};
pub use match_result::{Alert, MatchResult, RecommendationClass};
pub use route::{Route, TransportMode};
pub use service_health::{ServiceHealth, ServiceState};

/// The hierarchical ladder used to compute the "hierarchical gap" between a
/// candidate and a job (spec.md glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchicalLevel {
    Entry,
    Junior,
    Senior,
    Manager,
    Director,
    Executive,
}

impl HierarchicalLevel {
    /// Rank on the ladder, used to compute `gap = candidate.rank() - job.rank()`.
    pub fn rank(self) -> i32 {
        match self {
            HierarchicalLevel::Entry => 0,
            HierarchicalLevel::Junior => 1,
            HierarchicalLevel::Senior => 2,
            HierarchicalLevel::Manager => 3,
            HierarchicalLevel::Director => 4,
            HierarchicalLevel::Executive => 5,
        }
    }
}
