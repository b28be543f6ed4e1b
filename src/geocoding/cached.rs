//! Cache decorator over a [`Geocoder`], grounded in the teacher's
//! `geocoders::cache::Cache` (a `Geocoder` that wraps another `Geocoder`
//! and a key/value store), generalized to our [`MultiLevelCache`].

use std::sync::Arc;

use async_trait::async_trait;
use metrics::{counter, describe_counter};
use tracing::instrument;

use crate::cache::{MultiLevelCache, Namespace};
use crate::model::geocode::{GeocodeResult, QualityTier};

use super::{normalize_address, Geocoder};

/// Wraps `inner`, checking `cache` before every call and writing results
/// back on miss. FAILED-quality results (provider/fallback exhausted) are
/// still cached, the same way the teacher caches `None` geocoding results
/// so a known-bad address doesn't get re-requested every run.
pub struct CachedGeocoder {
    inner: Box<dyn Geocoder>,
    cache: Arc<MultiLevelCache>,
    /// When true, a cache miss is *not* forwarded to `inner` — used once
    /// the provider is near its daily quota (spec.md §4.1).
    cache_only: std::sync::atomic::AtomicBool,
}

impl CachedGeocoder {
    pub fn new(inner: Box<dyn Geocoder>, cache: Arc<MultiLevelCache>) -> Self {
        describe_counter!("nextvision.geocoding.cache_hits.total", "Addresses found in cache");
        describe_counter!("nextvision.geocoding.cache_misses.total", "Addresses not found in cache");
        CachedGeocoder {
            inner,
            cache,
            cache_only: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Force cache-only reads regardless of `inner`'s own quota signal,
    /// for callers that want to pin the behavior explicitly (tests, a
    /// manual ops override).
    pub fn set_cache_only(&self, cache_only: bool) {
        self.cache_only.store(cache_only, std::sync::atomic::Ordering::Relaxed);
    }
}

#[async_trait]
impl Geocoder for CachedGeocoder {
    #[instrument(skip(self), fields(address = %address))]
    async fn geocode(&self, address: &str) -> crate::Result<GeocodeResult> {
        let key = normalize_address(address);

        if let Some(cached) = self.cache.get::<GeocodeResult>(Namespace::Geocoding, &key).await? {
            counter!("nextvision.geocoding.cache_hits.total", 1);
            return Ok(cached);
        }
        counter!("nextvision.geocoding.cache_misses.total", 1);

        // spec.md §4.1: at 90% of the daily ceiling, prefer cache-only
        // reads automatically, in addition to any explicit override.
        let prefer_cache_only = self.cache_only.load(std::sync::atomic::Ordering::Relaxed) || self.inner.quota_pressure();
        if prefer_cache_only {
            return Ok(GeocodeResult {
                input_address: address.to_string(),
                formatted_address: address.to_string(),
                latitude: 0.0,
                longitude: 0.0,
                quality: QualityTier::Failed,
                place_id: None,
                cached_at: chrono::Utc::now(),
            });
        }

        let result = self.inner.geocode(address).await?;
        self.cache.set(Namespace::Geocoding, &key, &result).await?;
        Ok(result)
    }

    fn quota_pressure(&self) -> bool {
        self.inner.quota_pressure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheNamespaceTtls;
    use crate::kv_store::memory::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingGeocoder {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn geocode(&self, address: &str) -> crate::Result<GeocodeResult> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(GeocodeResult {
                input_address: address.to_string(),
                formatted_address: address.to_string(),
                latitude: 48.8,
                longitude: 2.3,
                quality: QualityTier::Exact,
                place_id: None,
                cached_at: chrono::Utc::now(),
            })
        }
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let cache = Arc::new(MultiLevelCache::new(Box::new(MemoryStore::new()), CacheNamespaceTtls::default()));
        let calls = Arc::new(AtomicU32::new(0));
        let inner = CountingGeocoder { calls: calls.clone() };
        let cached = CachedGeocoder::new(Box::new(inner), cache);

        cached.geocode("10 Downing Street").await.unwrap();
        cached.geocode("10 Downing Street").await.unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    struct QuotaPressuredGeocoder {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Geocoder for QuotaPressuredGeocoder {
        async fn geocode(&self, address: &str) -> crate::Result<GeocodeResult> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(GeocodeResult {
                input_address: address.to_string(),
                formatted_address: address.to_string(),
                latitude: 48.8,
                longitude: 2.3,
                quality: QualityTier::Exact,
                place_id: None,
                cached_at: chrono::Utc::now(),
            })
        }

        fn quota_pressure(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn misses_skip_the_provider_when_inner_reports_quota_pressure() {
        let cache = Arc::new(MultiLevelCache::new(Box::new(MemoryStore::new()), CacheNamespaceTtls::default()));
        let calls = Arc::new(AtomicU32::new(0));
        let inner = QuotaPressuredGeocoder { calls: calls.clone() };
        let cached = CachedGeocoder::new(Box::new(inner), cache);

        let result = cached.geocode("somewhere new").await.unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 0, "provider must not be called under quota pressure");
        assert_eq!(result.quality, QualityTier::Failed);
    }
}
