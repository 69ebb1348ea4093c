use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::debug;

use crate::export::generator::ExportResult;
use crate::export::options::ExportOptions;
use crate::models::ContentSnapshot;

/// Content hash of an export request.
///
/// Both halves are serialized with object keys sorted and `null` members
/// dropped, so field order and unset optionals never change the key.
pub fn cache_key(
    snapshot: &ContentSnapshot,
    options: &ExportOptions,
) -> Result<String, serde_json::Error> {
    let snapshot = normalize(serde_json::to_value(snapshot)?);
    let options = normalize(serde_json::to_value(options)?);

    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&snapshot)?);
    hasher.update(b"\n");
    hasher.update(serde_json::to_vec(&options)?);
    Ok(hex::encode(hasher.finalize()))
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, normalize(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
}

struct CacheEntry {
    result: ExportResult,
    inserted_at: Instant,
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    max_size: usize,
    ttl: Duration,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.inserted_at)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            debug!(cache_key = %key, "Evicted oldest export cache entry");
        }
    }
}

/// Process-local store of successful export results.
///
/// Ages are measured on the tokio clock so paused-time tests can advance it.
pub struct ExportCache {
    state: Mutex<CacheState>,
}

impl ExportCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                max_size,
                ttl,
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Returns a live entry. Expired entries are dropped on the way.
    pub fn get(&self, key: &str) -> Option<ExportResult> {
        let mut state = self.state.lock();
        let ttl = state.ttl;
        let expired = match state.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < ttl => {
                let result = entry.result.clone();
                state.hits += 1;
                return Some(result);
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            state.entries.remove(key);
        }
        state.misses += 1;
        None
    }

    /// Stores a result, evicting the oldest entry when full.
    pub fn insert(&self, key: String, result: ExportResult) {
        let mut state = self.state.lock();
        if state.max_size == 0 {
            return;
        }
        if !state.entries.contains_key(&key) && state.entries.len() >= state.max_size {
            state.evict_oldest();
        }
        state.entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drops every entry older than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.state.lock();
        let ttl = state.ttl;
        let before = state.entries.len();
        state.entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
        before - state.entries.len()
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// Applies new limits, trimming the oldest entries if the cache shrank.
    pub fn configure(&self, max_size: usize, ttl: Duration) {
        let mut state = self.state.lock();
        state.max_size = max_size;
        state.ttl = ttl;
        while state.entries.len() > max_size {
            state.evict_oldest();
        }
    }

    pub fn ttl(&self) -> Duration {
        self.state.lock().ttl
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            max_size: state.max_size,
            hits: state.hits,
            misses: state.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::generator::{Artifact, Performance};
    use crate::export::options::OutputType;
    use crate::export::renderer::ExportPayload;
    use crate::models::snapshot::PersonalInfo;
    use bytes::Bytes;
    use chrono::Utc;

    fn result(tag: &'static [u8]) -> ExportResult {
        let artifact = Artifact {
            payload: ExportPayload::Buffer(Bytes::from_static(tag)),
            filename: "x_resume.pdf".into(),
            warnings: Vec::new(),
        };
        ExportResult::succeeded(
            artifact,
            Performance::measure(Utc::now(), std::time::Instant::now()),
            1,
        )
    }

    fn snapshot(name: &str) -> ContentSnapshot {
        ContentSnapshot {
            personal_info: PersonalInfo {
                full_name: name.into(),
                email: "a@example.com".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_key_is_stable_and_sensitive() {
        let opts = ExportOptions::default();
        let a = cache_key(&snapshot("Ada"), &opts).unwrap();
        assert_eq!(a, cache_key(&snapshot("Ada"), &opts).unwrap());
        assert_eq!(a.len(), 64);
        assert_ne!(a, cache_key(&snapshot("Grace"), &opts).unwrap());

        let base64 = ExportOptions {
            output: OutputType::Base64,
            ..Default::default()
        };
        assert_ne!(a, cache_key(&snapshot("Ada"), &base64).unwrap());
    }

    #[test]
    fn test_normalize_sorts_keys_and_drops_nulls() {
        let v = normalize(serde_json::json!({ "b": 1, "a": null, "c": [{ "z": null, "y": 2 }] }));
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"b":1,"c":[{"y":2}]}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = ExportCache::new(4, Duration::from_secs(60));
        cache.insert("k".into(), result(b"a"));
        assert!(cache.get("k").is_some());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get("k").is_none());
        let stats = cache.stats();
        assert_eq!((stats.entries, stats.hits, stats.misses), (0, 1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_evicts_oldest() {
        let cache = ExportCache::new(2, Duration::from_secs(60));
        cache.insert("first".into(), result(b"1"));
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.insert("second".into(), result(b"2"));
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.insert("third".into(), result(b"3"));

        assert!(cache.get("first").is_none());
        assert!(cache.get("second").is_some());
        assert!(cache.get("third").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_only_removes_stale() {
        let cache = ExportCache::new(4, Duration::from_secs(10));
        cache.insert("old".into(), result(b"1"));
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert("new".into(), result(b"2"));
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.stats().entries, 1);
        assert!(cache.get("new").is_some());
    }
}
