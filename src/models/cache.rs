use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub payload: Value,
    pub timestamp: Instant,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Absent,
    Fresh,
    Stale,
}

/// Per-dataset payload cache with a fixed TTL.
///
/// Entries are only ever overwritten by a successful refresh. Expired entries
/// stay around so they can be served when every upstream source is down.
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.lock().get(key).cloned()
    }

    pub fn put(&self, key: &str, payload: Value) {
        self.lock().insert(
            key.to_string(),
            CacheEntry {
                payload,
                timestamp: Instant::now(),
            },
        );
    }

    /// Returns the payload only while it is younger than the TTL.
    pub fn get_fresh(&self, key: &str) -> Option<Value> {
        self.lock()
            .get(key)
            .filter(|entry| entry.age() < self.ttl)
            .map(|entry| entry.payload.clone())
    }

    pub fn is_fresh(&self, key: &str) -> bool {
        self.state(key) == CacheState::Fresh
    }

    pub fn state(&self, key: &str) -> CacheState {
        match self.lock().get(key) {
            None => CacheState::Absent,
            Some(entry) if entry.age() < self.ttl => CacheState::Fresh,
            Some(_) => CacheState::Stale,
        }
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
