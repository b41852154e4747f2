//! Durable response cache validated by server freshness tokens.
//!
//! Each entry is stored as `{"data": .., "cacheKey": <token>, "timestamp": <ms>}`
//! under a caller-chosen key. An entry is only served as valid when its token
//! matches the server's current token *and* it is younger than `max_age`;
//! otherwise it stays on disk as a stale fallback until overwritten, evicted,
//! or invalidated.
//!
//! Storage problems never escape this module: corrupt entries read as misses
//! and writes that cannot fit even after eviction are dropped.

use crate::cache::store::KvStore;
use crate::utils::now_millis;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Entries kept by capacity eviction.
pub const DEFAULT_RETENTION: usize = 10;

/// Key prefixes owned by the cache. Bulk operations never touch other keys.
pub const TRACKED_PREFIXES: [&str; 3] = ["dashboard_", "user_", "tenant_"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Server freshness token at write time.
    #[serde(rename = "cacheKey")]
    pub freshness_token: String,
    /// Epoch milliseconds. Legacy entries without one read as 0.
    #[serde(rename = "timestamp", default)]
    pub stored_at: i64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, freshness_token: impl Into<String>, stored_at: i64) -> Self {
        Self {
            data,
            freshness_token: freshness_token.into(),
            stored_at,
        }
    }

    fn is_expired(&self, now: i64, max_age: Duration) -> bool {
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        now.saturating_sub(self.stored_at) > max_age_ms
    }
}

/// Result of looking up an entry against the current freshness token.
#[derive(Debug, PartialEq)]
pub enum ReadOutcome<T> {
    Hit(T),
    Absent,
    /// Stored value could not be decoded; treated as absent.
    Corrupted,
    TokenMismatch,
    Expired,
}

impl<T> ReadOutcome<T> {
    pub fn into_hit(self) -> Option<T> {
        match self {
            ReadOutcome::Hit(data) => Some(data),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReadOutcome::Hit(_) => "hit",
            ReadOutcome::Absent => "absent",
            ReadOutcome::Corrupted => "corrupted",
            ReadOutcome::TokenMismatch => "token_mismatch",
            ReadOutcome::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Stored,
    /// The first attempt hit the quota; older entries were evicted and the retry succeeded.
    StoredAfterEviction { evicted: usize },
    /// Not cached. The caller still has its data.
    Dropped,
}

#[derive(Clone)]
pub struct PersistentCache {
    store: Arc<dyn KvStore>,
    max_age: Duration,
    retention: usize,
    prefixes: Arc<[String]>,
}

impl PersistentCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            max_age: DEFAULT_MAX_AGE,
            retention: DEFAULT_RETENTION,
            prefixes: TRACKED_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Whether `key` falls under one of the cache-owned prefixes.
    pub fn is_tracked(&self, key: &str) -> bool {
        self.prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>, ()> {
        let Some(raw) = self.store.get(key) else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|e| {
            warn!(key, error = %e, "ignoring unreadable cache entry");
        })
    }

    /// Look up `key`, returning data only if it was written under
    /// `current_token` and is no older than the configured max age.
    pub fn read_valid<T: DeserializeOwned>(&self, key: &str, current_token: &str) -> ReadOutcome<T> {
        self.read_valid_at(key, current_token, now_millis())
    }

    fn read_valid_at<T: DeserializeOwned>(
        &self,
        key: &str,
        current_token: &str,
        now: i64,
    ) -> ReadOutcome<T> {
        let entry = match self.load::<T>(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return ReadOutcome::Absent,
            Err(()) => return ReadOutcome::Corrupted,
        };
        if entry.freshness_token != current_token {
            return ReadOutcome::TokenMismatch;
        }
        if entry.is_expired(now, self.max_age) {
            return ReadOutcome::Expired;
        }
        ReadOutcome::Hit(entry.data)
    }

    /// Last stored payload for `key`, ignoring token and age.
    pub fn read_stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.load::<T>(key).ok().flatten().map(|entry| entry.data)
    }

    /// Store `payload` under `key`, stamped with `token` and the current time.
    ///
    /// On quota failure, evicts down to the newest `retention` tracked entries
    /// and retries once. Never fails: an entry that still cannot be written is
    /// dropped.
    pub fn write<T: Serialize>(&self, key: &str, payload: &T, token: &str) -> WriteOutcome {
        let entry = CacheEntry::new(payload, token, now_millis());
        let encoded = match serde_json::to_string(&entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key, error = %e, "failed to encode cache entry");
                return WriteOutcome::Dropped;
            }
        };

        match self.store.set(key, &encoded) {
            Ok(()) => WriteOutcome::Stored,
            Err(e) if e.is_quota() => {
                let evicted = self.evict_oldest();
                match self.store.set(key, &encoded) {
                    Ok(()) => WriteOutcome::StoredAfterEviction { evicted },
                    Err(e) => {
                        warn!(key, evicted, error = %e, "failed to cache data after eviction");
                        WriteOutcome::Dropped
                    }
                }
            }
            Err(e) => {
                warn!(key, error = %e, "failed to cache data");
                WriteOutcome::Dropped
            }
        }
    }

    /// Remove all but the newest `retention` tracked entries.
    ///
    /// Tracked keys whose value is not valid JSON are removed outright.
    /// Entries without a timestamp count as oldest and go first.
    pub fn evict_oldest(&self) -> usize {
        let mut removed = 0;
        let mut stamped: Vec<(i64, String)> = Vec::new();

        for key in self.store.keys() {
            if !self.is_tracked(&key) {
                continue;
            }
            let Some(raw) = self.store.get(&key) else {
                continue;
            };
            match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(value) => {
                    let stored_at = value
                        .get("timestamp")
                        .and_then(serde_json::Value::as_i64)
                        .unwrap_or(0);
                    stamped.push((stored_at, key));
                }
                Err(_) => {
                    self.store.remove(&key);
                    removed += 1;
                }
            }
        }

        // Newest first; key order breaks ties so eviction is deterministic.
        stamped.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        for (_, key) in stamped.into_iter().skip(self.retention) {
            if self.store.remove(&key) {
                removed += 1;
            }
        }

        info!(removed, retention = self.retention, "evicted old cache entries");
        removed
    }

    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.store.remove(key);
        debug!(key, removed, "invalidated cache entry");
        removed
    }

    /// Remove every tracked entry, leaving unrelated keys (theme, language, tokens) alone.
    pub fn invalidate_all(&self) -> usize {
        let removed = self
            .store
            .keys()
            .into_iter()
            .filter(|key| self.is_tracked(key))
            .filter(|key| self.store.remove(key))
            .count();
        info!(removed, "invalidated all cache entries");
        removed
    }
}
