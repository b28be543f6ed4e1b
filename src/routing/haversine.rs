//! Haversine-distance fallback router, used when the provider or its
//! circuit is unavailable (spec.md §4.2). Grounded in
//! `original_source/nextvision/services/transport_calculator.py`'s
//! nominal-speed fallback, translated into a pure [`Router`] impl so the
//! same trait covers both the live and degraded paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::geocode::GeocodeResult;
use crate::model::route::{Route, TransportMode};

use super::Router;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
/// Cache TTL for a fallback-derived route (spec.md §4.2): short, since it's
/// a rough estimate that should be displaced by a live route as soon as one
/// becomes available again.
const FALLBACK_CACHE_SECONDS: i64 = 30 * 60;

fn haversine_meters(origin: &GeocodeResult, destination: &GeocodeResult) -> f64 {
    let (lat1, lat2) = (origin.latitude.to_radians(), destination.latitude.to_radians());
    let dlat = (destination.latitude - origin.latitude).to_radians();
    let dlon = (destination.longitude - origin.longitude).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Computes a straight-line distance and a duration derived from each
/// mode's nominal speed (spec.md §4.2: walking ~5 km/h, cycling ~15 km/h,
/// driving ~30 km/h urban, transit ~20 km/h). No traffic data, no transfer
/// count.
pub struct HaversineRouter;

impl HaversineRouter {
    pub fn new() -> Self {
        HaversineRouter
    }
}

impl Default for HaversineRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Router for HaversineRouter {
    async fn route(
        &self,
        origin: &GeocodeResult,
        destination: &GeocodeResult,
        mode: TransportMode,
        departure_time: Option<DateTime<Utc>>,
    ) -> crate::Result<Route> {
        let distance_meters = haversine_meters(origin, destination);
        let speed_mps = mode.nominal_speed_kmh() * 1000.0 / 3600.0;
        let duration_seconds = if distance_meters < 1.0 { 1.0 } else { distance_meters / speed_mps };

        let now = Utc::now();
        Ok(Route {
            origin: origin.clone(),
            destination: destination.clone(),
            mode,
            duration_seconds: duration_seconds.round().max(1.0) as u32,
            distance_meters: distance_meters.round() as u32,
            traffic_factor: None,
            transfer_count: None,
            computed_at: now,
            cache_until: now + chrono::Duration::seconds(FALLBACK_CACHE_SECONDS),
            from_live_provider: false,
        })
        .map(|route| {
            let _ = departure_time;
            route
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::geocode::QualityTier;

    fn point(lat: f64, lon: f64) -> GeocodeResult {
        GeocodeResult {
            input_address: "x".into(),
            formatted_address: "x".into(),
            latitude: lat,
            longitude: lon,
            quality: QualityTier::Exact,
            place_id: None,
            cached_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn distance_between_distinct_points_is_positive() {
        let router = HaversineRouter::new();
        let paris = point(48.8566, 2.3522);
        let la_defense = point(48.8918, 2.2359);
        let route = router.route(&paris, &la_defense, TransportMode::Driving, None).await.unwrap();
        assert!(route.distance_meters > 0);
        assert!(route.duration_seconds > 0);
        assert!(!route.from_live_provider);
    }

    #[tokio::test]
    async fn slower_modes_take_longer_over_the_same_distance() {
        let router = HaversineRouter::new();
        let paris = point(48.8566, 2.3522);
        let la_defense = point(48.8918, 2.2359);
        let walking = router.route(&paris, &la_defense, TransportMode::Walking, None).await.unwrap();
        let driving = router.route(&paris, &la_defense, TransportMode::Driving, None).await.unwrap();
        assert!(walking.duration_seconds > driving.duration_seconds);
    }

    #[tokio::test]
    async fn same_point_yields_near_zero_distance_but_nonzero_duration() {
        let router = HaversineRouter::new();
        let paris = point(48.8566, 2.3522);
        let route = router.route(&paris, &paris, TransportMode::Walking, None).await.unwrap();
        assert_eq!(route.distance_meters, 0);
        assert!(route.duration_seconds >= 1);
    }
}
