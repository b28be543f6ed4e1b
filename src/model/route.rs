//! Routes between two geocoded points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geocode::GeocodeResult;

/// A transport mode a candidate may accept and a job's commute may be
/// computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    PublicTransit,
    Driving,
    Cycling,
    Walking,
}

impl TransportMode {
    /// Nominal speed in km/h used by the haversine fallback router when no
    /// live provider route is available (spec.md §4.2).
    pub fn nominal_speed_kmh(self) -> f64 {
        match self {
            TransportMode::Walking => 5.0,
            TransportMode::Cycling => 15.0,
            TransportMode::Driving => 30.0,
            TransportMode::PublicTransit => 20.0,
        }
    }

    /// Tie-break order for "best option" selection: transit before driving
    /// before cycling before walking (spec.md §4.6).
    pub fn tie_break_rank(self) -> u8 {
        match self {
            TransportMode::PublicTransit => 0,
            TransportMode::Driving => 1,
            TransportMode::Cycling => 2,
            TransportMode::Walking => 3,
        }
    }
}

/// A computed (or fallback-computed) route between two points for one mode.
///
/// Invariant: `duration_seconds > 0` when `quality != Failed` on either
/// endpoint, `distance_meters > 0` for non-walking routes between distinct
/// points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub origin: GeocodeResult,
    pub destination: GeocodeResult,
    pub mode: TransportMode,
    pub duration_seconds: u32,
    pub distance_meters: u32,
    /// Ratio of in-traffic duration to free-flow duration, when known.
    pub traffic_factor: Option<f64>,
    /// Number of transfers, transit-only.
    pub transfer_count: Option<u32>,
    pub computed_at: DateTime<Utc>,
    pub cache_until: DateTime<Utc>,
    /// Whether this route came from a live provider call or the haversine
    /// fallback. Surfaced in `MatchResult::engine_metadata`.
    pub from_live_provider: bool,
}

impl Route {
    /// Duration in whole minutes, rounded up, used throughout transport
    /// scoring (which works in minutes, per spec.md §4.6).
    pub fn duration_minutes(&self) -> u32 {
        (self.duration_seconds + 59) / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_break_prefers_transit_then_driving_then_cycling_then_walking() {
        let mut modes = vec![
            TransportMode::Walking,
            TransportMode::Driving,
            TransportMode::PublicTransit,
            TransportMode::Cycling,
        ];
        modes.sort_by_key(|m| m.tie_break_rank());
        assert_eq!(
            modes,
            vec![
                TransportMode::PublicTransit,
                TransportMode::Driving,
                TransportMode::Cycling,
                TransportMode::Walking,
            ]
        );
    }

    #[test]
    fn duration_minutes_rounds_up() {
        let route = Route {
            origin: dummy_geocode(),
            destination: dummy_geocode(),
            mode: TransportMode::Walking,
            duration_seconds: 61,
            distance_meters: 100,
            traffic_factor: None,
            transfer_count: None,
            computed_at: Utc::now(),
            cache_until: Utc::now(),
            from_live_provider: false,
        };
        assert_eq!(route.duration_minutes(), 2);
    }

    fn dummy_geocode() -> GeocodeResult {
        GeocodeResult {
            input_address: "a".into(),
            formatted_address: "a".into(),
            latitude: 0.0,
            longitude: 0.0,
            quality: super::super::geocode::QualityTier::Exact,
            place_id: None,
            cached_at: Utc::now(),
        }
    }
}
