//! Geocoding (spec.md §4.1): address normalization, the external provider
//! contract, the cached decorator, and the fixed-centroid fallback.

pub mod cached;
pub mod fallback;
pub mod provider;

use async_trait::async_trait;

use crate::model::geocode::GeocodeResult;

pub use cached::CachedGeocoder;
pub use fallback::FixedCentroidFallback;
pub use provider::HttpGeocoder;

/// Abstract geocoding interface, grounded in the teacher's `Geocoder` trait
/// (same decorator shape: `CachedGeocoder` and `FixedCentroidFallback` both
/// implement this over an inner `Box<dyn Geocoder>`).
#[async_trait]
pub trait Geocoder: Send + Sync + 'static {
    async fn geocode(&self, address: &str) -> crate::Result<GeocodeResult>;

    /// Geocode many addresses; the default sequential implementation is
    /// overridden by decorators that can batch (the cache, in particular).
    async fn geocode_batch(&self, addresses: &[String]) -> crate::Result<Vec<GeocodeResult>> {
        let mut out = Vec::with_capacity(addresses.len());
        for address in addresses {
            out.push(self.geocode(address).await?);
        }
        Ok(out)
    }

    /// Whether this geocoder is near its daily quota and batch callers
    /// should ease off concurrency (spec.md §4.10's 90%-quota backpressure
    /// halving). Decorators forward to their inner geocoder; only a
    /// quota-tracking provider overrides this to `true`.
    fn quota_pressure(&self) -> bool {
        false
    }
}

/// Normalize an address the way spec.md §4.1 requires before it becomes a
/// cache key: trim, lowercase, collapse whitespace, strip commas.
pub fn normalize_address(address: &str) -> String {
    let without_commas = address.replace(',', " ");
    without_commas.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_whitespace_and_commas() {
        assert_eq!(normalize_address("  78 Rue de Rivoli,  75004   Paris "), "78 rue de rivoli 75004 paris");
    }
}
