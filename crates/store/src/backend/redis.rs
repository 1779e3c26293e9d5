use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;
use otell_core::error::{OtellError, Result};

use crate::backend::KvBackend;

/// `KvBackend` over a Redis-compatible server, via `fred`.
///
/// `fred::clients::RedisClient` is a cheap `Arc`-backed handle; cloning it
/// (as every `Store` clone does) shares the same connection rather than
/// opening a new one.
#[derive(Clone)]
pub struct RedisBackend {
    client: RedisClient,
}

impl RedisBackend {
    /// Connects to `host:port` and waits for the connection to come up
    /// before returning, so a misconfigured backend fails fast at startup
    /// rather than on the first request.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let config = RedisConfig::from_url(&format!("redis://{host}:{port}"))
            .map_err(|e| OtellError::Backend(format!("invalid redis url: {e}")))?;
        let client = RedisClient::new(config, None, None, None);
        client.connect();
        client
            .wait_for_connect()
            .await
            .map_err(|e| OtellError::Backend(format!("redis connect failed: {e}")))?;
        Ok(Self { client })
    }
}

fn backend_err(e: impl std::fmt::Display) -> OtellError {
    OtellError::Backend(e.to_string())
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expire = Expiration::EX(ttl.as_secs() as i64);
        let _: () = self
            .client
            .set(key, value, Some(expire), None, false)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.client.get(key).await.map_err(backend_err)
    }

    async fn list_push_right(&self, key: &str, value: &str) -> Result<()> {
        let _: i64 = self.client.rpush(key, value).await.map_err(backend_err)?;
        Ok(())
    }

    async fn list_range(&self, key: &str, lo: isize, hi: isize) -> Result<Vec<String>> {
        self.client
            .lrange(key, lo as i64, hi as i64)
            .await
            .map_err(backend_err)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        let _: i64 = self.client.sadd(key, member).await.map_err(backend_err)?;
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        self.client.smembers(key).await.map_err(backend_err)
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        self.client.sismember(key, member).await.map_err(backend_err)
    }

    async fn set_cardinality(&self, key: &str) -> Result<usize> {
        let n: i64 = self.client.scard(key).await.map_err(backend_err)?;
        Ok(n.max(0) as usize)
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let _: i64 = self
            .client
            .zadd(key, None, None, false, false, (score, member))
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn sorted_set_range_by_rank_desc(
        &self,
        key: &str,
        lo: isize,
        hi: isize,
    ) -> Result<Vec<String>> {
        self.client
            .zrevrange(key, lo as i64, hi as i64, false)
            .await
            .map_err(backend_err)
    }

    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<String>> {
        self.client
            .zrangebyscore(key, min, max, false, None)
            .await
            .map_err(backend_err)
    }

    async fn sorted_set_cardinality(&self, key: &str) -> Result<usize> {
        let n: i64 = self.client.zcard(key).await.map_err(backend_err)?;
        Ok(n.max(0) as usize)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let _: bool = self
            .client
            .expire(key, ttl.as_secs() as i64, None)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        self.client.incr(key).await.map_err(backend_err)
    }

    async fn ping(&self) -> Result<()> {
        let _: () = self.client.ping(None).await.map_err(backend_err)?;
        Ok(())
    }
}
