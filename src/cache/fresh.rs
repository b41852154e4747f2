//! Freshness-aware fetch wrapper.
//!
//! Every call asks the server for the scope's current freshness token (a
//! cheap request, deliberately neither cached nor deduplicated), serves the
//! stored payload if it was written under that token and is young enough, and
//! otherwise fetches and stores. Failures fall back to whatever was stored
//! last, regardless of token or age, before giving up:
//!
//! | step            | ok                   | err / miss          |
//! |-----------------|----------------------|---------------------|
//! | `CheckStatus`   | `ReadCache`          | `StaleFallback`     |
//! | `ReadCache`     | return hit           | `Fetch`             |
//! | `Fetch`         | `Store`              | `StaleFallback`     |
//! | `Store`         | return data          | (never fails)       |
//! | `StaleFallback` | return stale         | `DirectFetch`       |
//! | `DirectFetch`   | return data          | return error        |

use crate::api::{ApiError, CacheStatus};
use crate::cache::persistent::{PersistentCache, ReadOutcome};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// The unit a freshness token is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    User(u64),
    /// Aggregate over a whole tenant; only admins may ask for it.
    Tenant(u64),
}

impl Scope {
    pub fn is_admin(&self) -> bool {
        matches!(self, Scope::Tenant(_))
    }

    pub fn id(&self) -> u64 {
        match self {
            Scope::User(id) | Scope::Tenant(id) => *id,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::User(id) => write!(f, "user:{id}"),
            Scope::Tenant(id) => write!(f, "tenant:{id}"),
        }
    }
}

/// Source of server-side freshness tokens.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn cache_status(&self, scope: Scope) -> Result<CacheStatus, ApiError>;
}

enum Step<T> {
    CheckStatus,
    ReadCache { token: String },
    Fetch { token: String },
    Store { token: String, data: T },
    StaleFallback { cause: ApiError },
    DirectFetch,
}

/// Persistent cache paired with the status endpoint that validates it. Clone-cheap.
#[derive(Clone)]
pub struct FreshCache {
    cache: PersistentCache,
    status: Arc<dyn StatusSource>,
}

impl FreshCache {
    pub fn new(cache: PersistentCache, status: Arc<dyn StatusSource>) -> Self {
        Self { cache, status }
    }

    pub fn cache(&self) -> &PersistentCache {
        &self.cache
    }

    /// Return the payload for `key`, from cache when the server says it is
    /// still current, otherwise from `fetch`.
    ///
    /// `fetch` may run twice: once on a cache miss and once more as the last
    /// resort when that attempt failed and nothing stale was stored. Errors
    /// surface only after the stale fallback came up empty.
    pub async fn fetch_with_cache<T, F, Fut>(
        &self,
        key: &str,
        scope: Scope,
        fetch: F,
    ) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut step = Step::CheckStatus;
        loop {
            step = match step {
                Step::CheckStatus => match self.status.cache_status(scope).await {
                    Ok(status) => Step::ReadCache {
                        token: status.cache_key,
                    },
                    Err(cause) => Step::StaleFallback { cause },
                },
                Step::ReadCache { token } => match self.cache.read_valid::<T>(key, &token) {
                    ReadOutcome::Hit(data) => {
                        debug!(key, %scope, "cache hit");
                        return Ok(data);
                    }
                    miss => {
                        debug!(key, %scope, reason = miss.label(), "cache miss");
                        Step::Fetch { token }
                    }
                },
                Step::Fetch { token } => match fetch().await {
                    Ok(data) => Step::Store { token, data },
                    Err(cause) => Step::StaleFallback { cause },
                },
                Step::Store { token, data } => {
                    let outcome = self.cache.write(key, &data, &token);
                    debug!(key, ?outcome, "cached fresh data");
                    return Ok(data);
                }
                Step::StaleFallback { cause } => match self.cache.read_stale::<T>(key) {
                    Some(data) => {
                        warn!(key, %scope, error = %cause, "serving stale cached data");
                        return Ok(data);
                    }
                    None => {
                        warn!(key, %scope, error = %cause, "no cached data to fall back on");
                        Step::DirectFetch
                    }
                },
                Step::DirectFetch => return fetch().await,
            };
        }
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.cache.invalidate(key)
    }

    pub fn invalidate_all(&self) -> usize {
        self.cache.invalidate_all()
    }
}
