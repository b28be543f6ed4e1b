//! Routing (spec.md §4.2): the external provider contract, the haversine
//! fallback, and the cached decorator.

pub mod cached;
pub mod haversine;
pub mod provider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::geocode::GeocodeResult;
use crate::model::route::{Route, TransportMode};

pub use cached::CachedRouter;
pub use haversine::HaversineRouter;
pub use provider::HttpRouter;

/// Abstract routing interface, mirrored on [`crate::geocoding::Geocoder`]'s
/// shape: a provider, a cache decorator, and a pure fallback, all behind
/// the same trait.
#[async_trait]
pub trait Router: Send + Sync + 'static {
    async fn route(
        &self,
        origin: &GeocodeResult,
        destination: &GeocodeResult,
        mode: TransportMode,
        departure_time: Option<DateTime<Utc>>,
    ) -> crate::Result<Route>;
}

/// Cache key per spec.md §4.2: rounded coordinates, mode, and a
/// departure time truncated to the hour (so nearby departures share a
/// cache entry without pinning the key to the exact second).
pub fn route_cache_key(origin: &GeocodeResult, destination: &GeocodeResult, mode: TransportMode, departure_time: Option<DateTime<Utc>>) -> String {
    let round6 = |v: f64| (v * 1_000_000.0).round() as i64;
    let hour_bucket = departure_time.map(|t| t.timestamp() / 3600).unwrap_or(0);
    format!(
        "{}:{}:{}:{}:{:?}:{}",
        round6(origin.latitude),
        round6(origin.longitude),
        round6(destination.latitude),
        round6(destination.longitude),
        mode,
        hour_bucket,
    )
}
