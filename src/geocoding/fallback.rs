//! The region-default-centroid fallback used when the provider is
//! unreachable or the circuit is open (spec.md §4.1).

use async_trait::async_trait;
use chrono::Utc;

use crate::model::geocode::{GeocodeResult, QualityTier};

use super::Geocoder;

/// Always returns a FAILED-quality result pinned to a configured centroid.
/// Downstream scorers treat FAILED specially (no real distance computation),
/// per spec.md §4.1.
pub struct FixedCentroidFallback {
    pub centroid: (f64, f64),
}

impl FixedCentroidFallback {
    pub fn new(centroid: (f64, f64)) -> Self {
        FixedCentroidFallback { centroid }
    }
}

#[async_trait]
impl Geocoder for FixedCentroidFallback {
    async fn geocode(&self, address: &str) -> crate::Result<GeocodeResult> {
        Ok(GeocodeResult {
            input_address: address.to_string(),
            formatted_address: address.to_string(),
            latitude: self.centroid.0,
            longitude: self.centroid.1,
            quality: QualityTier::Failed,
            place_id: None,
            cached_at: Utc::now(),
        })
    }
}
