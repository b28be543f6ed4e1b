//! Geocoding results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolution quality of a geocoding result, ordered from the provider's
/// own resolution categories (spec.md §4.1): building-level match → EXACT,
/// range-interpolated/geometric-center → APPROXIMATE, coarser → PARTIAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Exact,
    Approximate,
    Partial,
    Failed,
}

/// The result of geocoding one address.
///
/// Invariant: `latitude` in `[-90, 90]`, `longitude` in `[-180, 180]`.
/// Produced by [`crate::geocoding::Geocoder`] and read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub input_address: String,
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub quality: QualityTier,
    /// Opaque identifier the provider assigned to this place, if any.
    pub place_id: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl GeocodeResult {
    /// Validate the coordinate invariant. Called at construction time by
    /// every `Geocoder` implementation before returning a result.
    pub fn validate(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut g = GeocodeResult {
            input_address: "x".into(),
            formatted_address: "x".into(),
            latitude: 91.0,
            longitude: 0.0,
            quality: QualityTier::Exact,
            place_id: None,
            cached_at: Utc::now(),
        };
        assert!(!g.validate());
        g.latitude = 48.8;
        assert!(g.validate());
    }
}
