//! Two-tier cache (spec.md §4.3): L1 in-process LRU, L2 a
//! [`crate::kv_store::KeyValueStore`]. Write-through; reads promote L2 hits
//! into L1. Grounded in the teacher's `geocoders::cache::Cache` (decorator
//! wrapping a `KeyValueStore`) generalized from a single geocoding-shaped
//! cache into a namespace-parameterized cache usable by any component.

pub mod compression;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Duration;

use lru::LruCache;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{instrument, warn};

use crate::config::CacheNamespaceTtls;
use crate::kv_store::KeyValueStore;

use self::compression::CacheCompressor;

/// The cache namespaces enumerated in spec.md §4.3, each with its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Geocoding,
    Routing,
    MatchResult,
    BridgeCache,
}

impl Namespace {
    fn prefix(self) -> &'static str {
        match self {
            Namespace::Geocoding => "nv:geo",
            Namespace::Routing => "nv:route",
            Namespace::MatchResult => "nv:match",
            Namespace::BridgeCache => "nv:bridge",
        }
    }

    fn ttl(self, policy: &CacheNamespaceTtls) -> Duration {
        match self {
            Namespace::Geocoding => policy.geocoding,
            Namespace::Routing => policy.routing,
            Namespace::MatchResult => policy.match_result,
            Namespace::BridgeCache => policy.bridge_cache,
        }
    }
}

const L1_CAPACITY: usize = 1000;
const L1_MAX_TTL: Duration = Duration::from_secs(5 * 60);

struct L1Entry {
    bytes: Vec<u8>,
    expires_at: std::time::Instant,
}

/// Two-tier cache over one [`KeyValueStore`]. Cheap to share: wrap in an
/// `Arc` at the call site the way the teacher shares its `SharedHttpClient`.
pub struct MultiLevelCache {
    l1: Mutex<LruCache<String, L1Entry>>,
    l2: Box<dyn KeyValueStore>,
    compressor: CacheCompressor,
    ttls: CacheNamespaceTtls,
    /// Set once an L2 operation fails; subsequent reads/writes go L1-only
    /// until cleared, surfaced through `l2_degraded`.
    l2_degraded: std::sync::atomic::AtomicBool,
}

impl MultiLevelCache {
    pub fn new(l2: Box<dyn KeyValueStore>, ttls: CacheNamespaceTtls) -> Self {
        MultiLevelCache {
            l1: Mutex::new(LruCache::new(std::num::NonZeroUsize::new(L1_CAPACITY).unwrap())),
            l2,
            compressor: CacheCompressor::new(),
            ttls,
            l2_degraded: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn l2_degraded(&self) -> bool {
        self.l2_degraded.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn key(namespace: Namespace, raw_key: &str) -> String {
        let mut hasher = DefaultHasher::new();
        raw_key.hash(&mut hasher);
        format!("{}:{:016x}", namespace.prefix(), hasher.finish())
    }

    #[instrument(skip(self), fields(namespace = ?namespace))]
    pub async fn get<T: DeserializeOwned>(&self, namespace: Namespace, raw_key: &str) -> crate::Result<Option<T>> {
        let key = Self::key(namespace, raw_key);

        if let Some(entry) = self.l1.lock().unwrap().get(&key) {
            if entry.expires_at > std::time::Instant::now() {
                return Ok(Some(self.decode(&entry.bytes)?));
            }
        }

        if self.l2_degraded() {
            return Ok(None);
        }

        match self.l2.get(&key).await {
            Ok(Some(bytes)) => {
                let value = self.decode(&bytes)?;
                let l1_ttl = L1_MAX_TTL.min(namespace.ttl(&self.ttls));
                self.l1.lock().unwrap().put(
                    key,
                    L1Entry {
                        bytes,
                        expires_at: std::time::Instant::now() + l1_ttl,
                    },
                );
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                warn!(error = %err, "L2 cache read failed, degrading to L1-only");
                self.l2_degraded.store(true, std::sync::atomic::Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value), fields(namespace = ?namespace))]
    pub async fn set<T: Serialize>(&self, namespace: Namespace, raw_key: &str, value: &T) -> crate::Result<()> {
        let key = Self::key(namespace, raw_key);
        let bytes = self.encode(value)?;
        let ttl = namespace.ttl(&self.ttls);
        let l1_ttl = L1_MAX_TTL.min(ttl);

        self.l1.lock().unwrap().put(
            key.clone(),
            L1Entry {
                bytes: bytes.clone(),
                expires_at: std::time::Instant::now() + l1_ttl,
            },
        );

        if self.l2_degraded() {
            return Ok(());
        }
        if let Err(err) = self.l2.set(&key, bytes, ttl).await {
            warn!(error = %err, "L2 cache write failed, degrading to L1-only");
            self.l2_degraded.store(true, std::sync::atomic::Ordering::Relaxed);
        }
        Ok(())
    }

    pub async fn delete(&self, namespace: Namespace, raw_key: &str) -> crate::Result<()> {
        let key = Self::key(namespace, raw_key);
        self.l1.lock().unwrap().pop(&key);
        if !self.l2_degraded() {
            let _ = self.l2.delete(&key).await;
        }
        Ok(())
    }

    fn encode<T: Serialize>(&self, value: &T) -> crate::Result<Vec<u8>> {
        let config = bincode::config::standard().with_little_endian().with_variable_int_encoding();
        let encoded = bincode::serde::encode_to_vec(value, config);
        match encoded {
            Ok(encoded) => {
                let mut compressed = Vec::with_capacity(encoded.len() + 1);
                compressed.push(self.compressor.id());
                self.compressor.compress(&encoded, &mut compressed)?;
                Ok(compressed)
            }
            Err(_) => {
                // Serialization failure: fall back to a string-encoded form
                // (spec.md §4.3), tagged so `decode` knows not to bincode-decode it.
                let json = serde_json::to_vec(value).map_err(|e| {
                    crate::errors::NextvisionError::InvariantViolation {
                        message: format!("could not encode cache value: {e}"),
                    }
                })?;
                let mut tagged = Vec::with_capacity(json.len() + 1);
                tagged.push(b'J');
                tagged.extend(json);
                Ok(tagged)
            }
        }
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> crate::Result<T> {
        if bytes.is_empty() {
            anyhow::bail!("empty cache entry");
        }
        if bytes[0] == b'J' {
            return serde_json::from_slice(&bytes[1..]).map_err(Into::into);
        }
        let mut decompressed = Vec::with_capacity(bytes.len() * 2);
        self.compressor.decompress(&bytes[1..], &mut decompressed)?;
        let config = bincode::config::standard().with_little_endian().with_variable_int_encoding();
        let (value, _) = bincode::serde::decode_from_slice(&decompressed, config)
            .map_err(|e| crate::errors::NextvisionError::InvariantViolation {
                message: format!("could not decode cache value: {e}"),
            })?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv_store::memory::MemoryStore;

    fn cache() -> MultiLevelCache {
        MultiLevelCache::new(Box::new(MemoryStore::new()), CacheNamespaceTtls::default())
    }

    #[tokio::test]
    async fn round_trips_through_l1_and_l2() {
        let cache = cache();
        cache.set(Namespace::Geocoding, "paris", &"hit".to_string()).await.unwrap();
        let value: Option<String> = cache.get(Namespace::Geocoding, "paris").await.unwrap();
        assert_eq!(value, Some("hit".to_string()));
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let cache = cache();
        let value: Option<String> = cache.get(Namespace::Geocoding, "nowhere").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn delete_clears_both_tiers() {
        let cache = cache();
        cache.set(Namespace::Routing, "a-b", &42i32).await.unwrap();
        cache.delete(Namespace::Routing, "a-b").await.unwrap();
        let value: Option<i32> = cache.get(Namespace::Routing, "a-b").await.unwrap();
        assert_eq!(value, None);
    }
}
