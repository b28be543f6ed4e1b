//! Per-mode commute analysis (spec.md §3's `TransportAnalysis`, §4.6 step 3-4).

use serde::{Deserialize, Serialize};

use crate::model::route::{Route, TransportMode};

/// Feasibility and quality of one transport mode for one (candidate, job) pair.
///
/// Invariant (spec.md §3): `feasible ⇔ actual_minutes ≤ allowed_minutes × (1 +
/// tolerance)`, checked transfer-count-too when `mode == PublicTransit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeAnalysis {
    pub mode: TransportMode,
    pub feasible: bool,
    pub actual_minutes: u32,
    pub allowed_minutes: u32,
    /// `allowed / actual`, capped at 1.0 so a very short commute doesn't
    /// dominate the mean in `TransportScore::efficiency`.
    pub efficiency_ratio: f64,
    pub comfort: f64,
    pub reliability: f64,
}

impl ModeAnalysis {
    /// Build the per-mode analysis from a computed route and the
    /// candidate's ceiling for this mode, per spec.md §4.6 steps 3-4.
    pub fn from_route(
        route: &Route,
        allowed_minutes: u32,
        tolerance: f64,
        max_transfers: Option<u32>,
        rush_hour: bool,
    ) -> Self {
        let actual_minutes = route.duration_minutes();
        let within_time = actual_minutes as f64 <= allowed_minutes as f64 * (1.0 + tolerance);
        let within_transfers = match (route.mode, route.transfer_count, max_transfers) {
            (TransportMode::PublicTransit, Some(transfers), Some(max)) => transfers <= max,
            _ => true,
        };
        let feasible = within_time && within_transfers;

        let efficiency_ratio = if actual_minutes == 0 {
            1.0
        } else {
            (allowed_minutes as f64 / actual_minutes as f64).min(1.0)
        };

        let comfort = comfort_for(route.mode, route);
        let reliability = reliability_for(route.mode, route, rush_hour);

        ModeAnalysis {
            mode: route.mode,
            feasible,
            actual_minutes,
            allowed_minutes,
            efficiency_ratio,
            comfort,
            reliability,
        }
    }
}

/// Comfort heuristic: transit penalized per transfer, walking/cycling
/// penalized for longer distances, driving treated as uniformly comfortable.
fn comfort_for(mode: TransportMode, route: &Route) -> f64 {
    match mode {
        TransportMode::PublicTransit => {
            let transfers = route.transfer_count.unwrap_or(0) as f64;
            (1.0 - 0.1 * transfers).max(0.2)
        }
        TransportMode::Walking => (1.0 - route.distance_meters as f64 / 5000.0).max(0.2),
        TransportMode::Cycling => (1.0 - route.distance_meters as f64 / 15000.0).max(0.3),
        TransportMode::Driving => 0.85,
    }
}

/// Reliability heuristic: rush hour degrades driving and transit (traffic
/// and crowding respectively); walking and cycling are unaffected.
fn reliability_for(mode: TransportMode, route: &Route, rush_hour: bool) -> f64 {
    let traffic_penalty = route.traffic_factor.map(|f| (f - 1.0).max(0.0) * 0.3).unwrap_or(0.0);
    let base = match mode {
        TransportMode::Driving => 0.9 - traffic_penalty,
        TransportMode::PublicTransit => {
            if rush_hour {
                0.75
            } else {
                0.9
            }
        }
        TransportMode::Cycling => 0.85,
        TransportMode::Walking => 0.95,
    };
    base.clamp(0.1, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::geocode::{GeocodeResult, QualityTier};
    use chrono::Utc;

    fn route(mode: TransportMode, duration_seconds: u32) -> Route {
        Route {
            origin: geocode(),
            destination: geocode(),
            mode,
            duration_seconds,
            distance_meters: 2000,
            traffic_factor: None,
            transfer_count: Some(1),
            computed_at: Utc::now(),
            cache_until: Utc::now(),
            from_live_provider: true,
        }
    }

    fn geocode() -> GeocodeResult {
        GeocodeResult {
            input_address: "a".into(),
            formatted_address: "a".into(),
            latitude: 0.0,
            longitude: 0.0,
            quality: QualityTier::Exact,
            place_id: None,
            cached_at: Utc::now(),
        }
    }

    #[test]
    fn feasible_within_tolerance() {
        let route = route(TransportMode::Walking, 15 * 60);
        let analysis = ModeAnalysis::from_route(&route, 15, 0.1, None, false);
        assert!(analysis.feasible);
    }

    #[test]
    fn infeasible_beyond_tolerance() {
        let route = route(TransportMode::Walking, 20 * 60);
        let analysis = ModeAnalysis::from_route(&route, 15, 0.1, None, false);
        assert!(!analysis.feasible);
    }

    #[test]
    fn transit_infeasible_on_transfer_count() {
        let route = route(TransportMode::PublicTransit, 10 * 60);
        let analysis = ModeAnalysis::from_route(&route, 15, 0.1, Some(0), false);
        assert!(!analysis.feasible);
    }
}
