//! Job requirement data model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::HierarchicalLevel;

/// Opaque job identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh, random job id.
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

/// How much of the work week must be spent on site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemotePolicy {
    Onsite,
    Hybrid,
    FullRemote,
}

impl RemotePolicy {
    /// Days per week the job allows working remotely, used by
    /// [`crate::transport::TransportScorer`]'s remote-mitigation bonus.
    pub fn allowed_remote_days(self, context_remote_days: Option<u8>) -> u8 {
        match self {
            RemotePolicy::Onsite => 0,
            RemotePolicy::FullRemote => 5,
            RemotePolicy::Hybrid => context_remote_days.unwrap_or(0).min(5),
        }
    }
}

/// A parsed job requirement, immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequirement {
    pub id: JobId,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub min_years_experience: u32,
    pub max_years_experience: Option<u32>,
    pub required_level: HierarchicalLevel,
    pub salary_min: u32,
    pub salary_max: u32,
    pub sector: String,
    pub office_address: String,
    pub remote_policy: RemotePolicy,
    /// Days per week a `Hybrid` job allows working remotely. Ignored for
    /// `Onsite`/`FullRemote`, where [`RemotePolicy::allowed_remote_days`]
    /// already has a fixed answer.
    pub hybrid_remote_days: Option<u8>,
    pub parking_provided: bool,
    pub flexible_hours: bool,
}
