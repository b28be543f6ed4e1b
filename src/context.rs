//! Composition root (spec.md §9's "global service registries" redesign
//! flag): one [`NextvisionContext`] is built once per process/tenant and
//! passed by `Arc` reference into every scoring and batch call. Nothing in
//! this crate reaches for a `static`/`OnceCell` singleton.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::cache::MultiLevelCache;
use crate::config::NextvisionConfig;
use crate::errors::NextvisionError;
use crate::geocoding::provider::shared_http_client;
use crate::geocoding::{CachedGeocoder, FixedCentroidFallback, Geocoder, HttpGeocoder};
use crate::kv_store;
use crate::model::geocode::GeocodeResult;
use crate::model::route::{Route, TransportMode};
use crate::resilience::{CircuitBreaker, DegradationManager};
use crate::routing::{CachedRouter, HaversineRouter, HttpRouter, Router};

/// Wraps a primary [`Geocoder`] with a [`DegradationManager`] registered to
/// fall back to a fixed centroid, so a provider outage degrades match
/// quality instead of failing every match in the batch.
struct DegradingGeocoder {
    inner: Box<dyn Geocoder>,
    degradation: DegradationManager<GeocodeResult>,
}

impl DegradingGeocoder {
    fn new(inner: Box<dyn Geocoder>, fallback_centroid: (f64, f64)) -> Self {
        let degradation = DegradationManager::new();
        degradation.register("geocoding", move |_err| {
            let fallback = FixedCentroidFallback::new(fallback_centroid);
            async move { fallback.geocode("").await }
        });
        DegradingGeocoder { inner, degradation }
    }
}

#[async_trait]
impl Geocoder for DegradingGeocoder {
    async fn geocode(&self, address: &str) -> crate::Result<GeocodeResult> {
        let outcome = self
            .degradation
            .run_with_fallback("geocoding", || self.inner.geocode(address))
            .await?;
        Ok(outcome.into_inner())
    }

    fn quota_pressure(&self) -> bool {
        self.inner.quota_pressure()
    }
}

/// Same shape as [`DegradingGeocoder`], over [`Router`] and the haversine
/// fallback.
///
/// Unlike [`DegradingGeocoder`], the fallback here needs the call's own
/// origin/destination/mode arguments rather than just the error, which
/// doesn't fit [`DegradationManager`]'s error-only fallback signature — so
/// this falls back inline instead of through the registry.
struct DegradingRouter {
    inner: Box<dyn Router>,
}

impl DegradingRouter {
    fn new(inner: Box<dyn Router>) -> Self {
        DegradingRouter { inner }
    }
}

#[async_trait]
impl Router for DegradingRouter {
    async fn route(
        &self,
        origin: &GeocodeResult,
        destination: &GeocodeResult,
        mode: TransportMode,
        departure_time: Option<chrono::DateTime<chrono::Utc>>,
    ) -> crate::Result<Route> {
        match self.inner.route(origin, destination, mode, departure_time).await {
            Ok(route) => Ok(route),
            Err(err) => {
                let nv_err = err
                    .downcast_ref::<NextvisionError>()
                    .cloned()
                    .unwrap_or_else(|| NextvisionError::FatalExternal {
                        service: "routing".into(),
                        message: err.to_string(),
                    });
                tracing::warn!(error = %nv_err, "routing provider failed, falling back to haversine estimate");
                HaversineRouter::new().route(origin, destination, mode, departure_time).await
            }
        }
    }
}

/// Everything a [`crate::scoring::MatchEngine`] or [`crate::batch::BatchOrchestrator`]
/// needs to run: the two-tier cache, the geocoder/router stacks (each
/// provider → cache → degrade-to-fallback chain already assembled), and the
/// configuration they were built from.
///
/// Build exactly one of these per process (or per tenant, in a
/// multi-tenant host) and share it behind an `Arc`.
pub struct NextvisionContext {
    pub config: NextvisionConfig,
    pub cache: Arc<MultiLevelCache>,
    pub geocoder: Arc<dyn Geocoder>,
    pub router: Arc<dyn Router>,
    pub geocoding_circuit: CircuitBreaker,
    pub routing_circuit: CircuitBreaker,
}

impl NextvisionContext {
    /// Assemble the full stack from configuration: connect the L2 store,
    /// wire up both circuit breakers, and layer cache + fallback decorators
    /// over the HTTP-backed geocoder and router.
    pub async fn new(config: NextvisionConfig) -> crate::Result<Self> {
        let store_url = Url::parse(&config.remote_store.url).map_err(|e| NextvisionError::InvalidInput {
            message: format!("invalid remote_store.url: {e}"),
        })?;
        let l2 = kv_store::new_from_url(store_url).await?;
        let cache = Arc::new(MultiLevelCache::new(l2, config.cache_ttls.clone()));

        let geocoding_circuit = CircuitBreaker::new("geocoding", config.circuit_breaker);
        let routing_circuit = CircuitBreaker::new("routing", config.circuit_breaker);

        let http_client = shared_http_client(32);

        let provider_geocoder = HttpGeocoder::new(http_client.clone(), config.map_provider.clone(), geocoding_circuit.clone());
        let cached_geocoder = CachedGeocoder::new(Box::new(provider_geocoder), cache.clone());
        let geocoder: Arc<dyn Geocoder> = Arc::new(DegradingGeocoder::new(Box::new(cached_geocoder), config.map_provider.fallback_centroid));

        let provider_router = HttpRouter::new(http_client, config.route_provider.clone(), routing_circuit.clone());
        let cached_router = CachedRouter::new(Box::new(provider_router), cache.clone());
        let router: Arc<dyn Router> = Arc::new(DegradingRouter::new(Box::new(cached_router)));

        Ok(NextvisionContext {
            config,
            cache,
            geocoder,
            router,
            geocoding_circuit,
            routing_circuit,
        })
    }

    /// Read-only health snapshot across every external service this context
    /// talks to (spec.md §3/§6's health-check surface): the geocoding and
    /// routing circuit breakers, plus a synthetic record for the remote
    /// cache tier, degraded once an L2 operation has failed.
    pub fn health_report(&self) -> Vec<crate::model::service_health::ServiceHealth> {
        let mut geocoding_health = self.geocoding_circuit.snapshot();
        if geocoding_health.state == crate::model::service_health::ServiceState::Healthy && self.geocoder.quota_pressure() {
            geocoding_health.state = crate::model::service_health::ServiceState::Degraded;
        }
        let mut report = vec![geocoding_health, self.routing_circuit.snapshot()];

        let mut cache_health = crate::model::service_health::ServiceHealth::new("remote_cache");
        if self.cache.l2_degraded() {
            cache_health.state = crate::model::service_health::ServiceState::Degraded;
        }
        report.push(cache_health);

        report
    }
}
