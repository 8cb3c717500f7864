//! Request Deduplication
//!
//! Collapses concurrent requests for the same key into one underlying
//! operation. The first caller for a key starts the operation; later callers
//! receive a clone of the same [`SharedResult`] until it settles.
//!
//! # Lifecycle
//!
//! ```text
//! get_or_fetch(key) ──► record present? ──yes──► clone of in-flight result
//!                              │
//!                              no
//!                              ▼
//!                  factory() ──► wrap with InFlightGuard ──► record ──► spawn driver
//!                                      │
//!                       settles or is dropped
//!                                      ▼
//!                        record removed (only if still ours)
//! ```
//!
//! The record is removed before any waiter observes the outcome, so a caller
//! that reacts to a failure by retrying starts a fresh operation. Each
//! operation is driven by a spawned task, which means it settles even when
//! every caller has stopped waiting and the record can never be orphaned.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::services::fetcher::{FetchResult, SharedResult};
use crate::services::runtime;

type InFlightMap<T> = Mutex<AHashMap<String, InFlight<T>>>;

struct InFlight<T> {
    id: u64,
    result: SharedResult<T>,
}

/// Removes its in-flight record when the operation settles or is dropped
struct InFlightGuard<T> {
    map: Weak<InFlightMap<T>>,
    key: String,
    id: u64,
}

impl<T> Drop for InFlightGuard<T> {
    fn drop(&mut self) {
        let Some(map) = self.map.upgrade() else {
            return;
        };
        let removed = {
            let mut map = map.lock();
            // A newer operation may own the key after a clear()
            if map.get(&self.key).is_some_and(|entry| entry.id == self.id) {
                map.remove(&self.key)
            } else {
                None
            }
        };
        if removed.is_some() {
            trace!(key = %self.key, "In-flight request settled");
        }
    }
}

/// Coalesces concurrent requests by key
pub struct RequestDeduplicator<T> {
    in_flight: Arc<InFlightMap<T>>,
    next_id: AtomicU64,
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(AHashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the in-flight operation for `key`, or start one with `factory`
    ///
    /// `factory` runs at most once per call and only when no operation for
    /// `key` is in flight. It must only build the future; it must not call
    /// back into this deduplicator.
    pub fn get_or_fetch<F, Fut>(&self, key: &str, factory: F) -> SharedResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult<T>> + Send + 'static,
    {
        let mut in_flight = self.in_flight.lock();
        if let Some(entry) = in_flight.get(key) {
            debug!(key = %key, "Joining in-flight request");
            return entry.result.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = InFlightGuard {
            map: Arc::downgrade(&self.in_flight),
            key: key.to_string(),
            id,
        };
        let operation = factory();
        let result = async move {
            let outcome = operation.await;
            drop(guard);
            outcome
        }
        .boxed()
        .shared();

        in_flight.insert(
            key.to_string(),
            InFlight {
                id,
                result: result.clone(),
            },
        );
        drop(in_flight);

        let driver = result.clone();
        runtime::spawn_named("dedup-request", async move {
            let _ = driver.await;
        });

        result
    }

    /// Whether an operation for `key` is in flight
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().contains_key(key)
    }

    /// Number of operations in flight
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Forget every in-flight record
    ///
    /// Running operations still settle for the callers already holding them;
    /// the next call for the same key starts a new operation.
    pub fn clear(&self) {
        // Records are dropped outside the lock since a dropped result may run its guard
        let drained = std::mem::take(&mut *self.in_flight.lock());
        drop(drained);
    }
}

impl<T> Default for RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counted(
        calls: &Arc<AtomicUsize>,
        delay: Duration,
        outcome: FetchResult<u32>,
    ) -> impl Future<Output = FetchResult<u32>> + Send + 'static {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(delay).await;
            outcome
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_share_one_operation() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = dedup.get_or_fetch("k", || counted(&calls, Duration::from_millis(50), Ok(7)));
        let second = dedup.get_or_fetch("k", || counted(&calls, Duration::from_millis(50), Ok(8)));
        assert_eq!(dedup.in_flight_count(), 1);

        let (a, b) = futures::join!(first, second);
        assert_eq!(a, Ok(7));
        assert_eq!(b, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!dedup.is_in_flight("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_keys_run_independently() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let a = dedup.get_or_fetch("a", || counted(&calls, Duration::from_millis(10), Ok(1)));
        let b = dedup.get_or_fetch("b", || counted(&calls, Duration::from_millis(10), Ok(2)));
        assert_eq!(futures::join!(a, b), (Ok(1), Ok(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_removes_record_before_waiters_resume() {
        let dedup = Arc::new(RequestDeduplicator::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let failed = dedup
            .get_or_fetch("k", || {
                counted(
                    &calls,
                    Duration::from_millis(10),
                    Err(FetchError::transient("down")),
                )
            })
            .await;
        assert!(failed.is_err());
        assert!(!dedup.is_in_flight("k"));

        let retried = dedup
            .get_or_fetch("k", || counted(&calls, Duration::from_millis(10), Ok(3)))
            .await;
        assert_eq!(retried, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_request_still_settles() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let pending = dedup.get_or_fetch("k", || counted(&calls, Duration::from_millis(20), Ok(5)));
        drop(pending);
        assert!(dedup.is_in_flight("k"));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(dedup.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_does_not_remove_newer_record() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let old = dedup.get_or_fetch("k", || counted(&calls, Duration::from_millis(10), Ok(1)));
        dedup.clear();
        let new = dedup.get_or_fetch("k", || counted(&calls, Duration::from_millis(50), Ok(2)));

        assert_eq!(old.await, Ok(1));
        // The old guard must leave the newer record in place
        assert!(dedup.is_in_flight("k"));
        assert_eq!(new.await, Ok(2));
        assert!(!dedup.is_in_flight("k"));
    }
}
