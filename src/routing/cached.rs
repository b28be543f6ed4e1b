//! Cache decorator over a [`Router`], mirroring
//! [`crate::geocoding::cached::CachedGeocoder`]'s shape over the
//! [`crate::cache::MultiLevelCache`]'s `Routing` namespace (spec.md §4.2's
//! shorter TTL relative to geocoding).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter};
use tracing::instrument;

use crate::cache::{MultiLevelCache, Namespace};
use crate::model::geocode::GeocodeResult;
use crate::model::route::{Route, TransportMode};

use super::{route_cache_key, Router};

/// Wraps `inner`, checking `cache` before every call and writing results
/// back on miss.
pub struct CachedRouter {
    inner: Box<dyn Router>,
    cache: Arc<MultiLevelCache>,
}

impl CachedRouter {
    pub fn new(inner: Box<dyn Router>, cache: Arc<MultiLevelCache>) -> Self {
        describe_counter!("nextvision.routing.cache_hits.total", "Routes found in cache");
        describe_counter!("nextvision.routing.cache_misses.total", "Routes not found in cache");
        CachedRouter { inner, cache }
    }
}

#[async_trait]
impl Router for CachedRouter {
    #[instrument(skip(self, origin, destination), fields(mode = ?mode))]
    async fn route(
        &self,
        origin: &GeocodeResult,
        destination: &GeocodeResult,
        mode: TransportMode,
        departure_time: Option<DateTime<Utc>>,
    ) -> crate::Result<Route> {
        let key = route_cache_key(origin, destination, mode, departure_time);

        if let Some(cached) = self.cache.get::<Route>(Namespace::Routing, &key).await? {
            counter!("nextvision.routing.cache_hits.total", 1);
            return Ok(cached);
        }
        counter!("nextvision.routing.cache_misses.total", 1);

        let route = self.inner.route(origin, destination, mode, departure_time).await?;
        self.cache.set(Namespace::Routing, &key, &route).await?;
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheNamespaceTtls;
    use crate::kv_store::memory::MemoryStore;
    use crate::model::geocode::QualityTier;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingRouter {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Router for CountingRouter {
        async fn route(
            &self,
            origin: &GeocodeResult,
            destination: &GeocodeResult,
            mode: TransportMode,
            _departure_time: Option<DateTime<Utc>>,
        ) -> crate::Result<Route> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let now = Utc::now();
            Ok(Route {
                origin: origin.clone(),
                destination: destination.clone(),
                mode,
                duration_seconds: 600,
                distance_meters: 2000,
                traffic_factor: None,
                transfer_count: None,
                computed_at: now,
                cache_until: now,
                from_live_provider: true,
            })
        }
    }

    fn point() -> GeocodeResult {
        GeocodeResult {
            input_address: "a".into(),
            formatted_address: "a".into(),
            latitude: 48.8,
            longitude: 2.3,
            quality: QualityTier::Exact,
            place_id: None,
            cached_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn second_identical_call_is_served_from_cache() {
        let cache = Arc::new(MultiLevelCache::new(Box::new(MemoryStore::new()), CacheNamespaceTtls::default()));
        let calls = Arc::new(AtomicU32::new(0));
        let cached = CachedRouter::new(Box::new(CountingRouter { calls: calls.clone() }), cache);

        let origin = point();
        let mut destination = point();
        destination.longitude = 2.35;

        cached.route(&origin, &destination, TransportMode::Walking, None).await.unwrap();
        cached.route(&origin, &destination, TransportMode::Walking, None).await.unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn different_modes_are_not_coalesced() {
        let cache = Arc::new(MultiLevelCache::new(Box::new(MemoryStore::new()), CacheNamespaceTtls::default()));
        let calls = Arc::new(AtomicU32::new(0));
        let cached = CachedRouter::new(Box::new(CountingRouter { calls: calls.clone() }), cache);

        let origin = point();
        let destination = point();

        cached.route(&origin, &destination, TransportMode::Walking, None).await.unwrap();
        cached.route(&origin, &destination, TransportMode::Driving, None).await.unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }
}
