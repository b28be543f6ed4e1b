//! Redis-backed [`KeyValueStore`], grounded directly on the teacher's
//! `key_value_stores::redis::Redis` (bb8 pool, `redis::pipe` pipelines),
//! extended with per-key TTL via `SET ... EX`.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use metrics::{describe_histogram, histogram, Unit};
use redis::AsyncCommands;
use tracing::instrument;
use url::Url;

use super::KeyValueStore;

pub struct RedisStore {
    pool: Pool<RedisConnectionManager>,
}

impl RedisStore {
    #[instrument(name = "RedisStore::new", level = "trace", skip_all)]
    pub async fn new(url: Url) -> crate::Result<Self> {
        describe_histogram!(
            "nextvision.redis.get_request.duration_seconds",
            Unit::Seconds,
            "Time required for Redis GET requests"
        );
        describe_histogram!(
            "nextvision.redis.set_request.duration_seconds",
            Unit::Seconds,
            "Time required for Redis SET requests"
        );

        let manager = RedisConnectionManager::new(url).context("could not create Redis connection manager")?;
        let pool = Pool::builder()
            .build(manager)
            .await
            .context("could not create Redis connection pool")?;
        Ok(RedisStore { pool })
    }

    async fn client(&self) -> crate::Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool.get().await.context("could not get Redis client").map_err(Into::into)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    #[instrument(name = "RedisStore::get", level = "trace", skip(self))]
    async fn get(&self, key: &str) -> crate::Result<Option<Vec<u8>>> {
        let start = Instant::now();
        let mut client = self.client().await?;
        let result: Option<Vec<u8>> = client.get(key).await.context("could not GET key from Redis")?;
        histogram!(
            "nextvision.redis.get_request.duration_seconds",
            (Instant::now() - start).as_secs_f64(),
        );
        Ok(result)
    }

    #[instrument(name = "RedisStore::set", level = "trace", skip(self, value))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> crate::Result<()> {
        let start = Instant::now();
        let mut client = self.client().await?;
        let ttl_secs = ttl.as_secs().max(1);
        let _: () = client
            .set_ex(key, value, ttl_secs)
            .await
            .context("could not SET key in Redis")?;
        histogram!(
            "nextvision.redis.set_request.duration_seconds",
            (Instant::now() - start).as_secs_f64(),
        );
        Ok(())
    }

    #[instrument(name = "RedisStore::delete", level = "trace", skip(self))]
    async fn delete(&self, key: &str) -> crate::Result<()> {
        let mut client = self.client().await?;
        let _: () = client.del(key).await.context("could not DEL key in Redis")?;
        Ok(())
    }

    async fn get_many(&self, keys: &[String]) -> crate::Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut client = self.client().await?;
        let mut pipeline = redis::pipe();
        for key in keys {
            pipeline.cmd("GET").arg(key);
        }
        let result = pipeline
            .query_async(&mut *client)
            .await
            .context("could not pipeline GET keys from Redis")?;
        Ok(result)
    }

    async fn set_many(&self, entries: &[(String, Vec<u8>)], ttl: Duration) -> crate::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut client = self.client().await?;
        let mut pipeline = redis::pipe();
        let ttl_secs = ttl.as_secs().max(1);
        for (key, value) in entries {
            pipeline.cmd("SET").arg(key).arg(value).arg("EX").arg(ttl_secs).ignore();
        }
        let _: () = pipeline
            .query_async(&mut *client)
            .await
            .context("could not pipeline SET keys in Redis")?;
        Ok(())
    }
}
