//! HTTP-backed geocoder, grounded in the teacher's `smarty::client`
//! (`hyper` + `hyper-rustls` request/response plumbing, `metrics`
//! histograms around the request) and `google_maps_service.py`'s
//! resolution-tier mapping and daily-quota tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::StreamExt;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Request};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use metrics::{counter, describe_histogram, histogram, Unit};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::config::MapProviderConfig;
use crate::errors::NextvisionError;
use crate::model::geocode::{GeocodeResult, QualityTier};
use crate::resilience::circuit_breaker::CircuitBreaker;

use super::{normalize_address, Geocoder};

/// A `hyper` client shared between concurrent geocoding calls, the way the
/// teacher shares one `SharedHttpClient` across all its geocoders.
pub type SharedHttpClient = Arc<Client<HttpsConnector<HttpConnector>>>;

pub fn shared_http_client(pool_max_idle_per_host: usize) -> SharedHttpClient {
    Arc::new(
        Client::builder().pool_max_idle_per_host(pool_max_idle_per_host).build(
            HttpsConnectorBuilder::new()
                .with_native_roots()
                .https_only()
                .enable_http2()
                .build(),
        ),
    )
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    formatted_address: String,
    latitude: f64,
    longitude: f64,
    /// The provider's own resolution category string, mapped onto
    /// `QualityTier` per spec.md §4.1.
    resolution: String,
    place_id: Option<String>,
}

fn resolution_to_quality(resolution: &str) -> QualityTier {
    match resolution {
        "rooftop" | "building" => QualityTier::Exact,
        "range_interpolated" | "geometric_center" => QualityTier::Approximate,
        _ => QualityTier::Partial,
    }
}

/// Geocodes against an external map provider over HTTP, tracking a local
/// daily request counter and consulting a [`CircuitBreaker`] before every
/// call (spec.md §4.1, §4.4).
pub struct HttpGeocoder {
    client: SharedHttpClient,
    config: MapProviderConfig,
    circuit_breaker: CircuitBreaker,
    requests_today: AtomicU64,
}

impl HttpGeocoder {
    pub fn new(client: SharedHttpClient, config: MapProviderConfig, circuit_breaker: CircuitBreaker) -> Self {
        describe_histogram!(
            "nextvision.geocoding.request.duration_seconds",
            Unit::Seconds,
            "Time required to geocode one address"
        );
        HttpGeocoder {
            client,
            config,
            circuit_breaker,
            requests_today: AtomicU64::new(0),
        }
    }

    /// Whether we've crossed the warning threshold of the daily ceiling
    /// (spec.md §4.1: "at 90% of the daily ceiling, emit a warning and
    /// begin preferring cache-only").
    pub fn quota_warning(&self) -> bool {
        let used = self.requests_today.load(Ordering::Relaxed) as f64;
        used >= self.config.daily_request_ceiling as f64 * self.config.quota_warning_fraction
    }

    pub fn requests_today(&self) -> u64 {
        self.requests_today.load(Ordering::Relaxed)
    }

    async fn call_provider(&self, normalized: &str) -> crate::Result<ProviderResponse> {
        let mut url = url::Url::parse(&self.config.endpoint_url)?;
        url.query_pairs_mut()
            .append_pair("address", normalized)
            .append_pair("locale", &self.config.locale_bias)
            .append_pair("key", &self.config.api_key)
            .finish();

        let req = Request::builder()
            .method("GET")
            .uri(url.as_str())
            .body(Body::empty())
            .map_err(|e| NextvisionError::InvalidInput { message: e.to_string() })?;

        let res = self.client.request(req).await.map_err(|e| NextvisionError::Transient {
            service: "geocoding".into(),
            message: e.to_string(),
        })?;

        let status = res.status();
        let mut body = res.into_body();
        let mut body_data = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| NextvisionError::Transient {
                service: "geocoding".into(),
                message: e.to_string(),
            })?;
            body_data.extend(&chunk[..]);
        }

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(NextvisionError::Transient {
                service: "geocoding".into(),
                message: format!("status {status}"),
            }
            .into());
        }
        if status.as_u16() == 403 && body_data.windows(5).any(|w| w == b"quota") {
            return Err(NextvisionError::QuotaExceeded { service: "geocoding".into() }.into());
        }
        if !status.is_success() {
            return Err(NextvisionError::InvalidInput {
                message: format!("geocoding provider returned {status}"),
            }
            .into());
        }

        serde_json::from_slice(&body_data).map_err(|e| {
            NextvisionError::FatalExternal {
                service: "geocoding".into(),
                message: format!("could not parse provider response: {e}"),
            }
            .into()
        })
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    #[instrument(skip(self), fields(address = %address))]
    async fn geocode(&self, address: &str) -> crate::Result<GeocodeResult> {
        self.circuit_breaker.guard()?;
        let normalized = normalize_address(address);

        let start = Instant::now();
        let result = self.call_provider(&normalized).await;
        histogram!("nextvision.geocoding.request.duration_seconds", (Instant::now() - start).as_secs_f64());

        match result {
            Ok(response) => {
                self.requests_today.fetch_add(1, Ordering::Relaxed);
                self.circuit_breaker.record_success();
                counter!("nextvision.geocoding.requests.total", 1, "outcome" => "success");
                if self.quota_warning() {
                    warn!(used = self.requests_today(), ceiling = self.config.daily_request_ceiling, "geocoding quota approaching ceiling");
                }
                let result = GeocodeResult {
                    input_address: address.to_string(),
                    formatted_address: response.formatted_address,
                    latitude: response.latitude,
                    longitude: response.longitude,
                    quality: resolution_to_quality(&response.resolution),
                    place_id: response.place_id,
                    cached_at: Utc::now(),
                };
                if !result.validate() {
                    return Err(NextvisionError::InvariantViolation {
                        message: format!("geocoder returned out-of-range coordinates for {address:?}"),
                    }
                    .into());
                }
                Ok(result)
            }
            Err(err) => {
                self.circuit_breaker.record_failure();
                counter!("nextvision.geocoding.requests.total", 1, "outcome" => "failure");
                Err(err)
            }
        }
    }

    fn quota_pressure(&self) -> bool {
        self.quota_warning()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_resolution_strings_to_quality_tiers() {
        assert_eq!(resolution_to_quality("rooftop"), QualityTier::Exact);
        assert_eq!(resolution_to_quality("range_interpolated"), QualityTier::Approximate);
        assert_eq!(resolution_to_quality("anything_else"), QualityTier::Partial);
    }

    #[test]
    fn quota_warning_fires_at_configured_fraction() {
        let geocoder = HttpGeocoder::new(
            shared_http_client(1),
            MapProviderConfig {
                endpoint_url: "https://maps.example.invalid/v1/geocode".into(),
                api_key: "k".into(),
                daily_request_ceiling: 100,
                quota_warning_fraction: 0.9,
                locale_bias: "fr".into(),
                fallback_centroid: (48.8566, 2.3522),
            },
            CircuitBreaker::new("geocoding", Default::default()),
        );
        for _ in 0..89 {
            geocoder.requests_today.fetch_add(1, Ordering::Relaxed);
        }
        assert!(!geocoder.quota_warning());
        geocoder.requests_today.fetch_add(1, Ordering::Relaxed);
        assert!(geocoder.quota_warning());
    }
}
