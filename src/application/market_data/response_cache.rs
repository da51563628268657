use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;

/// Fixed freshness window for upstream responses
pub const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// Time-bounded store for upstream JSON responses, keyed by endpoint + query.
///
/// No size bound and no LRU: the key space is the set of tracked coins and
/// endpoints. Expired entries stay in the map so `get_stale` can serve them
/// as a last-known value.
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.len())
            .finish()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::with_ttl(CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fresh value for `key`, or `None` if missing or at least `ttl` old
    pub fn get(&self, key: &str) -> Option<Value> {
        let guard = match self.entries.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Last known value for `key` regardless of age
    pub fn get_stale(&self, key: &str) -> Option<Value> {
        let guard = match self.entries.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get(key).map(|entry| entry.value.clone())
    }

    pub fn put(&self, key: impl Into<String>, value: Value) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
        };

        match self.entries.write() {
            Ok(mut guard) => {
                guard.insert(key.into(), entry);
            }
            Err(poisoned) => {
                tracing::error!("ResponseCache: Lock poisoned during write, recovering");
                poisoned.into_inner().insert(key.into(), entry);
            }
        }
    }

    pub fn invalidate(&self, key: &str) -> bool {
        match self.entries.write() {
            Ok(mut guard) => guard.remove(key).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(key).is_some(),
        }
    }

    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}
