use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use otell_core::error::{OtellError, Result};
use tokio::sync::Mutex;

use crate::backend::KvBackend;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    List(Vec<String>),
    Set(Vec<String>),
    ZSet(Vec<(String, f64)>),
    Counter(i64),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|t| Instant::now() < t)
    }
}

/// In-process `KvBackend`. Used by the integration test harness and by the
/// zero-dependency standalone run mode (`OTELL_BACKEND=memory`); it
/// implements the same TTL-governed-key semantics the real Redis backend
/// gets for free from the server, by tracking an expiry `Instant` per key
/// and treating reads of an expired key as absent.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn wrong_type(key: &str) -> OtellError {
    OtellError::Backend(format!("wrong type for key {key}"))
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(e) if e.is_live() => match &e.value {
                Value::Str(s) => Ok(Some(s.clone())),
                // Redis stores counters as strings internally, so INCR then
                // GET on the same key returns the counter's decimal form.
                Value::Counter(n) => Ok(Some(n.to_string())),
                _ => Err(wrong_type(key)),
            },
            _ => Ok(None),
        }
    }

    async fn list_push_right(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let live = entries.get(key).is_some_and(Entry::is_live);
        if !live {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::List(Vec::new()),
                    expires_at: None,
                },
            );
        }
        let entry = entries.get_mut(key).expect("just inserted or already live");
        match &mut entry.value {
            Value::List(items) => {
                items.push(value.to_string());
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn list_range(&self, key: &str, lo: isize, hi: isize) -> Result<Vec<String>> {
        let entries = self.entries.lock().await;
        let items = match entries.get(key) {
            Some(e) if e.is_live() => match &e.value {
                Value::List(items) => items,
                _ => return Err(wrong_type(key)),
            },
            _ => return Ok(Vec::new()),
        };
        Ok(slice_range(items, lo, hi).to_vec())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let live = entries.get(key).is_some_and(Entry::is_live);
        if !live {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Set(Vec::new()),
                    expires_at: None,
                },
            );
        }
        let entry = entries.get_mut(key).expect("just inserted or already live");
        match &mut entry.value {
            Value::Set(members) => {
                if !members.iter().any(|m| m == member) {
                    members.push(member.to_string());
                }
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(e) if e.is_live() => match &e.value {
                Value::Set(members) => Ok(members.clone()),
                _ => Err(wrong_type(key)),
            },
            _ => Ok(Vec::new()),
        }
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(e) if e.is_live() => match &e.value {
                Value::Set(members) => Ok(members.iter().any(|m| m == member)),
                _ => Err(wrong_type(key)),
            },
            _ => Ok(false),
        }
    }

    async fn set_cardinality(&self, key: &str) -> Result<usize> {
        Ok(self.set_members(key).await?.len())
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let live = entries.get(key).is_some_and(Entry::is_live);
        if !live {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::ZSet(Vec::new()),
                    expires_at: None,
                },
            );
        }
        let entry = entries.get_mut(key).expect("just inserted or already live");
        match &mut entry.value {
            Value::ZSet(members) => {
                if let Some(existing) = members.iter_mut().find(|(m, _)| m == member) {
                    existing.1 = score;
                } else {
                    members.push((member.to_string(), score));
                }
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn sorted_set_range_by_rank_desc(
        &self,
        key: &str,
        lo: isize,
        hi: isize,
    ) -> Result<Vec<String>> {
        let entries = self.entries.lock().await;
        let mut members = match entries.get(key) {
            Some(e) if e.is_live() => match &e.value {
                Value::ZSet(members) => members.clone(),
                _ => return Err(wrong_type(key)),
            },
            _ => return Ok(Vec::new()),
        };
        members.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let names: Vec<String> = members.into_iter().map(|(m, _)| m).collect();
        Ok(slice_range(&names, lo, hi).to_vec())
    }

    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<String>> {
        let entries = self.entries.lock().await;
        let mut members = match entries.get(key) {
            Some(e) if e.is_live() => match &e.value {
                Value::ZSet(members) => members.clone(),
                _ => return Err(wrong_type(key)),
            },
            _ => return Ok(Vec::new()),
        };
        members.retain(|(_, score)| *score >= min && *score <= max);
        members.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(members.into_iter().map(|(m, _)| m).collect())
    }

    async fn sorted_set_cardinality(&self, key: &str) -> Result<usize> {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(e) if e.is_live() => match &e.value {
                Value::ZSet(members) => Ok(members.len()),
                _ => Err(wrong_type(key)),
            },
            _ => Ok(0),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let mut entries = self.entries.lock().await;
        let live = entries.get(key).is_some_and(Entry::is_live);
        if !live {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Counter(0),
                    expires_at: None,
                },
            );
        }
        let entry = entries.get_mut(key).expect("just inserted or already live");
        match &mut entry.value {
            Value::Counter(n) => {
                *n += 1;
                Ok(*n)
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Redis `LRANGE`-style inclusive slicing: negative indices count from the
/// end, out-of-range bounds clamp rather than error.
fn slice_range(items: &[String], lo: isize, hi: isize) -> &[String] {
    let len = items.len() as isize;
    if len == 0 {
        return &[];
    }
    let norm = |i: isize| -> isize { if i < 0 { (len + i).max(0) } else { i } };
    let lo = norm(lo).min(len);
    let hi = norm(hi).min(len - 1);
    if lo > hi || lo >= len {
        return &[];
    }
    &items[lo as usize..=(hi as usize)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn string_roundtrip_with_ttl() {
        let backend = MemoryBackend::new();
        backend
            .set_with_ttl("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn expired_string_reads_as_absent() {
        let backend = MemoryBackend::new();
        backend
            .set_with_ttl("k", "v", Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn sorted_set_rank_desc_orders_by_score() {
        let backend = MemoryBackend::new();
        backend.sorted_set_add("z", "a", 1.0).await.unwrap();
        backend.sorted_set_add("z", "b", 3.0).await.unwrap();
        backend.sorted_set_add("z", "c", 2.0).await.unwrap();
        let top2 = backend
            .sorted_set_range_by_rank_desc("z", 0, 1)
            .await
            .unwrap();
        assert_eq!(top2, vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn set_add_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.set_add("s", "x").await.unwrap();
        backend.set_add("s", "x").await.unwrap();
        assert_eq!(backend.set_cardinality("s").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_range_supports_negative_indices() {
        let backend = MemoryBackend::new();
        for v in ["a", "b", "c"] {
            backend.list_push_right("l", v).await.unwrap();
        }
        let all = backend.list_range("l", 0, -1).await.unwrap();
        assert_eq!(all, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn increment_starts_at_one() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.increment("c").await.unwrap(), 1);
        assert_eq!(backend.increment("c").await.unwrap(), 2);
    }
}
