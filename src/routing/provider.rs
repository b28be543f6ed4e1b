//! HTTP-backed router, grounded in the same `hyper` + `hyper-rustls`
//! request/response plumbing as [`crate::geocoding::provider::HttpGeocoder`]
//! and in `original_source/nextvision/services/google_maps_service.py`'s
//! directions endpoint (leg distance/duration, transit transfer counts,
//! traffic-aware duration).

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Request};
use hyper_rustls::HttpsConnector;
use metrics::{counter, describe_histogram, histogram, Unit};
use serde::Deserialize;
use tracing::instrument;

use crate::config::RouteProviderConfig;
use crate::errors::NextvisionError;
use crate::model::geocode::GeocodeResult;
use crate::model::route::{Route, TransportMode};
use crate::resilience::circuit_breaker::CircuitBreaker;

use super::Router;

fn mode_param(mode: TransportMode) -> &'static str {
    match mode {
        TransportMode::Driving => "driving",
        TransportMode::PublicTransit => "transit",
        TransportMode::Walking => "walking",
        TransportMode::Cycling => "bicycling",
    }
}

#[derive(Debug, Deserialize)]
struct ProviderLeg {
    distance_meters: u32,
    duration_seconds: u32,
    duration_in_traffic_seconds: Option<u32>,
    transfer_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    legs: Vec<ProviderLeg>,
}

/// Routes against an external directions provider over HTTP, the spec.md
/// §6.3 "map provider (directions)" contract: origin/destination as
/// (lat,lon), a mode, and an optional departure time for traffic-aware
/// durations.
pub struct HttpRouter {
    client: Arc<Client<HttpsConnector<HttpConnector>>>,
    config: RouteProviderConfig,
    circuit_breaker: CircuitBreaker,
}

impl HttpRouter {
    pub fn new(client: Arc<Client<HttpsConnector<HttpConnector>>>, config: RouteProviderConfig, circuit_breaker: CircuitBreaker) -> Self {
        describe_histogram!(
            "nextvision.routing.request.duration_seconds",
            Unit::Seconds,
            "Time required to compute one route"
        );
        HttpRouter { client, config, circuit_breaker }
    }

    async fn call_provider(
        &self,
        origin: &GeocodeResult,
        destination: &GeocodeResult,
        mode: TransportMode,
        departure_time: Option<DateTime<Utc>>,
    ) -> crate::Result<ProviderResponse> {
        let mut url = url::Url::parse(&self.config.endpoint_url)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("origin", &format!("{},{}", origin.latitude, origin.longitude))
                .append_pair("destination", &format!("{},{}", destination.latitude, destination.longitude))
                .append_pair("mode", mode_param(mode))
                .append_pair("key", &self.config.api_key);
            if let Some(departure) = departure_time {
                pairs.append_pair("departure_time", &departure.timestamp().to_string());
                pairs.append_pair("traffic_model", "best_guess");
            }
        }

        let req = Request::builder()
            .method("GET")
            .uri(url.as_str())
            .body(Body::empty())
            .map_err(|e| NextvisionError::InvalidInput { message: e.to_string() })?;

        let res = self.client.request(req).await.map_err(|e| NextvisionError::Transient {
            service: "routing".into(),
            message: e.to_string(),
        })?;

        let status = res.status();
        let mut body = res.into_body();
        let mut body_data = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| NextvisionError::Transient {
                service: "routing".into(),
                message: e.to_string(),
            })?;
            body_data.extend(&chunk[..]);
        }

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(NextvisionError::Transient {
                service: "routing".into(),
                message: format!("status {status}"),
            }
            .into());
        }
        if status.as_u16() == 403 && body_data.windows(5).any(|w| w == b"quota") {
            return Err(NextvisionError::QuotaExceeded { service: "routing".into() }.into());
        }
        if !status.is_success() {
            return Err(NextvisionError::InvalidInput {
                message: format!("routing provider returned {status}"),
            }
            .into());
        }

        serde_json::from_slice(&body_data).map_err(|e| {
            NextvisionError::FatalExternal {
                service: "routing".into(),
                message: format!("could not parse provider response: {e}"),
            }
            .into()
        })
    }
}

#[async_trait]
impl Router for HttpRouter {
    #[instrument(skip(self, origin, destination), fields(mode = ?mode))]
    async fn route(
        &self,
        origin: &GeocodeResult,
        destination: &GeocodeResult,
        mode: TransportMode,
        departure_time: Option<DateTime<Utc>>,
    ) -> crate::Result<Route> {
        self.circuit_breaker.guard()?;

        let start = Instant::now();
        let result = self.call_provider(origin, destination, mode, departure_time).await;
        histogram!("nextvision.routing.request.duration_seconds", (Instant::now() - start).as_secs_f64());

        match result {
            Ok(response) => {
                self.circuit_breaker.record_success();
                counter!("nextvision.routing.requests.total", 1, "outcome" => "success");
                let leg = response.legs.into_iter().next().ok_or_else(|| NextvisionError::FatalExternal {
                    service: "routing".into(),
                    message: "provider returned no legs".into(),
                })?;
                let traffic_factor = leg
                    .duration_in_traffic_seconds
                    .filter(|&t| leg.duration_seconds > 0)
                    .map(|t| t as f64 / leg.duration_seconds as f64);
                let now = Utc::now();
                Ok(Route {
                    origin: origin.clone(),
                    destination: destination.clone(),
                    mode,
                    duration_seconds: leg.duration_in_traffic_seconds.unwrap_or(leg.duration_seconds).max(1),
                    distance_meters: leg.distance_meters,
                    traffic_factor,
                    transfer_count: leg.transfer_count,
                    computed_at: now,
                    cache_until: now + chrono::Duration::hours(1),
                    from_live_provider: true,
                })
            }
            Err(err) => {
                self.circuit_breaker.record_failure();
                counter!("nextvision.routing.requests.total", 1, "outcome" => "failure");
                Err(err)
            }
        }
    }
}
