//! Aggregate transport scoring (spec.md §4.6): the only component scorer
//! that suspends on external I/O, everything else in `scoring/` is pure and
//! in-memory.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::NextvisionConfig;
use crate::geocoding::Geocoder;
use crate::model::candidate::CandidateProfile;
use crate::model::job::JobRequirement;
use crate::model::route::TransportMode;
use crate::routing::Router;

use super::modes::ModeAnalysis;

/// Optional context that isn't captured in the candidate/job profiles
/// themselves but affects transport scoring (spec.md §4.6).
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportContext {
    pub departure_time: Option<DateTime<Utc>>,
    pub max_transit_transfers: Option<u32>,
}

/// The aggregate transport result attached to every [`crate::model::match_result::MatchResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportScore {
    pub time_compatibility: f64,
    pub flexibility_bonus: f64,
    pub efficiency: f64,
    pub reliability: f64,
    pub final_transport: f64,
    pub best_mode: Option<TransportMode>,
    pub per_mode: Vec<ModeAnalysis>,
    /// Whether the remote-work fallback path (spec.md §4.6, "zero modes
    /// compatible") was used to derive `final_transport`.
    pub remote_mitigation_applied: bool,
    pub used_live_map_data: bool,
}

/// Conservative baseline transport subscore when no mode is compatible and
/// no remote mitigation applies (spec.md §4.6).
const NO_MODE_BASELINE: f64 = 0.3;

/// Composes [`Geocoder`] and [`Router`] into the full mode-by-mode analysis
/// described in spec.md §4.6.
pub struct TransportScorer<'a> {
    config: &'a NextvisionConfig,
}

impl<'a> TransportScorer<'a> {
    pub fn new(config: &'a NextvisionConfig) -> Self {
        TransportScorer { config }
    }

    #[instrument(skip(self, candidate, job, geocoder, router))]
    pub async fn score(
        &self,
        candidate: &CandidateProfile,
        job: &JobRequirement,
        geocoder: &dyn Geocoder,
        router: &dyn Router,
        context: TransportContext,
    ) -> crate::Result<TransportScore> {
        if candidate.mobility.accepted_modes.is_empty() {
            return Ok(self.remote_fallback(job, context, false));
        }

        let origin = geocoder.geocode(&candidate.home_address).await?;
        let destination = geocoder.geocode(&job.office_address).await?;
        let used_live_map_data = origin.quality != crate::model::geocode::QualityTier::Failed
            && destination.quality != crate::model::geocode::QualityTier::Failed;

        let departure = context.departure_time.unwrap_or_else(Utc::now);
        let rush_hour = self.is_rush_hour(departure);

        let mut analyses = Vec::new();
        for &mode in &candidate.mobility.accepted_modes {
            let Some(allowed_minutes) = candidate.mobility.max_minutes_for(mode) else {
                continue;
            };
            let route = router.route(&origin, &destination, mode, Some(departure)).await?;
            let analysis = ModeAnalysis::from_route(
                &route,
                allowed_minutes,
                self.config.transport_time_tolerance,
                context.max_transit_transfers,
                rush_hour,
            );
            analyses.push((analysis, route.from_live_provider));
        }

        if analyses.is_empty() {
            return Ok(self.remote_fallback(job, context, used_live_map_data));
        }

        let total_modes = analyses.len() as f64;
        let compatible: Vec<&(ModeAnalysis, bool)> = analyses.iter().filter(|(a, _)| a.feasible).collect();
        let any_live = analyses.iter().any(|(_, live)| *live) || used_live_map_data;

        if compatible.is_empty() {
            let mut score = self.remote_fallback(job, context, any_live);
            score.per_mode = analyses.into_iter().map(|(a, _)| a).collect();
            return Ok(score);
        }

        let time_compatibility = compatible.len() as f64 / total_modes;
        let flexibility_bonus = (1.0 + 0.15 * (compatible.len() as f64 - 1.0).max(0.0)).min(1.15);
        let efficiency = compatible.iter().map(|(a, _)| a.efficiency_ratio.min(1.0)).sum::<f64>() / compatible.len() as f64;
        let reliability = compatible.iter().map(|(a, _)| a.reliability).sum::<f64>() / compatible.len() as f64;

        let final_transport = (0.5 * time_compatibility * flexibility_bonus + 0.25 * efficiency + 0.25 * reliability).clamp(0.0, 1.0);

        let best_mode = best_option(&compatible);

        Ok(TransportScore {
            time_compatibility,
            flexibility_bonus,
            efficiency,
            reliability,
            final_transport,
            best_mode,
            per_mode: analyses.into_iter().map(|(a, _)| a).collect(),
            remote_mitigation_applied: false,
            used_live_map_data: any_live,
        })
    }

    fn is_rush_hour(&self, at: DateTime<Utc>) -> bool {
        let weekday = at.weekday().num_days_from_monday();
        if weekday >= 5 {
            return false;
        }
        let hour = at.hour() as u8;
        self.config.rush_hour.windows.iter().any(|&(start, end)| hour >= start && hour < end)
    }

    /// The "zero modes compatible" path (spec.md §4.6): conservative
    /// baseline, boosted by remote-days/5 capped at +0.2 when the job
    /// permits remote work.
    fn remote_fallback(&self, job: &JobRequirement, context: TransportContext, used_live_map_data: bool) -> TransportScore {
        let remote_days = job.remote_policy.allowed_remote_days(job.hybrid_remote_days);
        let boost = (remote_days as f64 / 5.0).min(0.2);
        let final_transport = (NO_MODE_BASELINE + boost).clamp(0.0, 1.0);
        let _ = context;
        TransportScore {
            time_compatibility: 0.0,
            flexibility_bonus: 1.0,
            efficiency: 0.0,
            reliability: 0.0,
            final_transport,
            best_mode: None,
            per_mode: Vec::new(),
            remote_mitigation_applied: remote_days > 0,
            used_live_map_data,
        }
    }
}

/// Best-option tie-break: highest efficiency, then highest reliability,
/// then mode precedence transit > driving > cycling > walking (spec.md §4.6).
fn best_option(compatible: &[&(ModeAnalysis, bool)]) -> Option<TransportMode> {
    compatible
        .iter()
        .max_by(|(a, _), (b, _)| {
            a.efficiency_ratio
                .partial_cmp(&b.efficiency_ratio)
                .unwrap()
                .then(a.reliability.partial_cmp(&b.reliability).unwrap())
                .then(b.mode.tie_break_rank().cmp(&a.mode.tie_break_rank()))
        })
        .map(|(a, _)| a.mode)
}
