//! In-flight request deduplication.
//!
//! Concurrent callers asking for the same key share one underlying operation
//! and all observe its result, success or failure. Nothing is remembered once
//! the operation settles: the next call for the key starts a fresh one.
//!
//! A single table serves every payload type. Values travel type-erased through
//! the shared future and are downcast on the way out, so a key accidentally
//! reused for a different payload while in flight surfaces as
//! [`ApiError::KeyTypeMismatch`] rather than a bad cast.

use crate::api::ApiError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

type Payload = Arc<dyn Any + Send + Sync>;
type SharedFlight = Shared<BoxFuture<'static, Result<Payload, ApiError>>>;

struct Flight {
    /// Distinguishes successive flights for the same key.
    id: u64,
    future: SharedFlight,
}

/// Table of pending requests keyed by cache key. Clone-cheap.
#[derive(Clone, Default)]
pub struct Deduplicator {
    pending: Arc<DashMap<String, Flight>>,
    next_id: Arc<AtomicU64>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `operation` unless a request for `key` is already in flight, in
    /// which case wait for that one instead.
    ///
    /// The key is removed from the table exactly once, when the operation
    /// settles and before any waiter sees the result, so a failure never
    /// blocks a later retry. A panicking operation also releases its key; the
    /// panic then propagates to the waiters. Keys must encode every parameter that affects the
    /// response (tenant, user, filters); colliding keys merge unrelated requests.
    pub async fn dedupe<T, F, Fut>(&self, key: &str, operation: F) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let flight = match self.pending.entry(key.to_owned()) {
            Entry::Occupied(entry) => {
                debug!(key, "joining in-flight request");
                entry.get().future.clone()
            }
            Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let pending = Arc::clone(&self.pending);
                let owned_key = key.to_owned();
                let future = async move {
                    let outcome = AssertUnwindSafe(async move { operation().await })
                        .catch_unwind()
                        .await;
                    pending.remove_if(&owned_key, |_, flight| flight.id == id);
                    match outcome {
                        Ok(result) => {
                            debug!(key = owned_key, ok = result.is_ok(), "in-flight request settled");
                            result.map(|value| Arc::new(value) as Payload)
                        }
                        Err(panic) => {
                            warn!(key = owned_key, "in-flight request panicked");
                            std::panic::resume_unwind(panic)
                        }
                    }
                }
                .boxed()
                .shared();
                entry.insert(Flight {
                    id,
                    future: future.clone(),
                });
                future
            }
        };

        let payload = flight.await?;
        payload
            .downcast::<T>()
            .map(|value| T::clone(&value))
            .map_err(|_| ApiError::KeyTypeMismatch {
                key: key.to_owned(),
            })
    }

    /// Number of keys with a request currently in flight.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}
