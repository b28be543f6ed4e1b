//! Common interface to the remote (L2) key/value store used by
//! [`crate::cache::MultiLevelCache`], generalized from the teacher's
//! `key_value_stores` module to support per-key TTLs (the teacher's cache
//! never expired entries itself — it relied on Redis `SET` with no TTL and
//! let the cluster operator manage eviction; our namespace TTL policy
//! requires the store to carry the TTL on write).

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

pub mod memory;
pub mod redis;

/// A key/value store, like Redis. Pipelined operations batch many requests
/// into a single round trip, the way the teacher's cache does for a whole
/// CSV chunk of addresses at once.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> crate::Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> crate::Result<()>;

    async fn delete(&self, key: &str) -> crate::Result<()>;

    /// Fetch many keys in one round trip where the backend supports it.
    /// The default implementation issues sequential `get`s; backends that
    /// support real pipelining (Redis) should override this.
    async fn get_many(&self, keys: &[String]) -> crate::Result<Vec<Option<Vec<u8>>>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get(key).await?);
        }
        Ok(out)
    }

    /// Set many keys, all with the same TTL, in as few round trips as the
    /// backend allows.
    async fn set_many(&self, entries: &[(String, Vec<u8>)], ttl: Duration) -> crate::Result<()> {
        for (key, value) in entries {
            self.set(key, value.clone(), ttl).await?;
        }
        Ok(())
    }
}

/// Dispatch on URL scheme, mirroring the teacher's `KeyValueStore::new_from_url`.
pub async fn new_from_url(url: Url) -> crate::Result<Box<dyn KeyValueStore>> {
    match url.scheme() {
        "redis" | "rediss" => Ok(Box::new(redis::RedisStore::new(url).await?)),
        "memory" => Ok(Box::new(memory::MemoryStore::new())),
        scheme => Err(crate::errors::NextvisionError::InvalidInput {
            message: format!("don't know how to connect to {scheme}: URLs"),
        }
        .into()),
    }
}
