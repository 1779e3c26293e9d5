mod memory;
mod redis;

pub use memory::MemoryBackend;
pub use redis::RedisBackend;

use std::time::Duration;

use async_trait::async_trait;
use otell_core::error::Result;

/// Capability set a KV store must offer for the collector to persist and
/// query telemetry through it. Any backend implementing these primitives
/// atomically (per call) is a valid target: a Redis-compatible server, or an
/// in-process map for tests and zero-dependency standalone runs.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn list_push_right(&self, key: &str, value: &str) -> Result<()>;
    /// Inclusive range, Redis `LRANGE` semantics: negative indices count from
    /// the end, `-1` is the last element.
    async fn list_range(&self, key: &str, lo: isize, hi: isize) -> Result<Vec<String>>;

    async fn set_add(&self, key: &str, member: &str) -> Result<()>;
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool>;
    async fn set_cardinality(&self, key: &str) -> Result<usize>;

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<()>;
    /// Members ordered by descending score, i.e. most-recent-first when the
    /// score is a timestamp. `lo`/`hi` are zero-based inclusive ranks.
    async fn sorted_set_range_by_rank_desc(
        &self,
        key: &str,
        lo: isize,
        hi: isize,
    ) -> Result<Vec<String>>;
    async fn sorted_set_range_by_score(&self, key: &str, min: f64, max: f64)
    -> Result<Vec<String>>;
    async fn sorted_set_cardinality(&self, key: &str) -> Result<usize>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
    async fn increment(&self, key: &str) -> Result<i64>;
    async fn ping(&self) -> Result<()>;
}
