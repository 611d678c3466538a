//! TTL cache plus in-flight de-duplication.
//!
//! One `std::sync::Mutex` guards both the entries and the in-flight map. It
//! is never held across an `.await`: check-then-register and
//! store-then-clear each happen inside a single critical section.
//!
//! The producer for a key runs in its own spawned task. Callers only await a
//! [`Shared`] handle to that task, so a caller that gives up cancels its own
//! wait and nothing else.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use drilldown_core::{CacheError, OptionsResult};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::time::{Duration, Instant};

use super::config::CacheConfig;
use super::key::CacheKey;

/// Values the coordinator can cache.
pub trait CacheableResult: Clone + Send + Sync + 'static {
    /// Degraded values are kept for the shorter TTL.
    fn is_degraded(&self) -> bool;
}

impl CacheableResult for OptionsResult {
    fn is_degraded(&self) -> bool {
        self.is_stub()
    }
}

/// Outcome of [`CacheCoordinator::resolve_or_join`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<V> {
    pub value: V,
    /// Served from a live cache entry.
    pub cache_hit: bool,
    /// Joined a fetch another caller had already started.
    pub coalesced: bool,
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub joins: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub entries: usize,
    pub in_flight: usize,
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, CacheError>>>;

struct CacheEntry<V> {
    inserted_at: Instant,
    ttl: Duration,
    seq: u64,
    value: V,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) <= self.ttl
    }
}

struct CacheState<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    /// Insertion sequence -> key, oldest first.
    order: BTreeMap<u64, CacheKey>,
    in_flight: HashMap<CacheKey, SharedFetch<V>>,
    next_seq: u64,
    stats: CacheStats,
}

impl<V: CacheableResult> CacheState<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            in_flight: HashMap::new(),
            next_seq: 0,
            stats: CacheStats::default(),
        }
    }

    fn purge_expired(&mut self, now: Instant) {
        let expired: Vec<(CacheKey, u64)> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_live(now))
            .map(|(key, entry)| (key.clone(), entry.seq))
            .collect();

        for (key, seq) in expired {
            self.entries.remove(&key);
            self.order.remove(&seq);
            self.stats.expirations += 1;
        }
    }

    fn live_value(&self, key: &CacheKey) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert as the newest entry, replacing any previous one for `key`,
    /// then evict oldest-inserted entries down to `capacity`.
    fn store(&mut self, key: CacheKey, value: V, ttl: Duration, now: Instant, capacity: usize) {
        if let Some(previous) = self.entries.remove(&key) {
            self.order.remove(&previous.seq);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                inserted_at: now,
                ttl,
                seq,
                value,
            },
        );

        self.purge_expired(now);
        while self.entries.len() > capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
            tracing::debug!(key = %oldest, "evicted cache entry at capacity");
        }
    }
}

struct Inner<V> {
    config: CacheConfig,
    state: Mutex<CacheState<V>>,
}

impl<V> Inner<V> {
    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        // State stays consistent across a panic in another holder: every
        // critical section is a handful of map operations.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight marker for `key` unless disarmed, including when
/// the producer panics.
struct InFlightGuard<V: CacheableResult> {
    inner: Arc<Inner<V>>,
    key: CacheKey,
    armed: bool,
}

impl<V: CacheableResult> Drop for InFlightGuard<V> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.lock().in_flight.remove(&self.key);
        }
    }
}

/// Shared result cache and in-flight registry.
///
/// Cheap to clone; clones share state.
pub struct CacheCoordinator<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for CacheCoordinator<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: CacheableResult> CacheCoordinator<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(CacheState::new()),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Live cached value for `key`, if any. Purges expired entries.
    pub fn lookup(&self, key: &CacheKey) -> Option<V> {
        let mut state = self.inner.lock();
        state.purge_expired(Instant::now());
        let value = state.live_value(key);
        if value.is_some() {
            state.stats.hits += 1;
        }
        value
    }

    /// Return the cached value, join a fetch already underway, or start one.
    ///
    /// `producer` runs at most once per miss, in a spawned task. Its value is
    /// stored with the TTL chosen by [`CacheableResult::is_degraded`] before
    /// any waiter is released.
    ///
    /// # Errors
    /// [`CacheError::ProducerAborted`] if the producer task panicked or was
    /// cancelled. The in-flight marker is cleared either way.
    pub async fn resolve_or_join<F, Fut>(
        &self,
        key: CacheKey,
        producer: F,
    ) -> Result<Resolution<V>, CacheError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (fetch, coalesced) = {
            let mut state = self.inner.lock();
            state.purge_expired(Instant::now());

            if let Some(value) = state.live_value(&key) {
                state.stats.hits += 1;
                tracing::debug!(key = %key, "cache hit");
                return Ok(Resolution {
                    value,
                    cache_hit: true,
                    coalesced: false,
                });
            }

            if let Some(fetch) = state.in_flight.get(&key).cloned() {
                state.stats.joins += 1;
                tracing::debug!(key = %key, "joined in-flight fetch");
                (fetch, true)
            } else {
                state.stats.misses += 1;
                let fetch = self.spawn_fetch(key.clone(), producer);
                state.in_flight.insert(key, fetch.clone());
                (fetch, false)
            }
        };

        let value = fetch.await?;
        Ok(Resolution {
            value,
            cache_hit: false,
            coalesced,
        })
    }

    fn spawn_fetch<F, Fut>(&self, key: CacheKey, producer: F) -> SharedFetch<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let mut guard = InFlightGuard {
                inner,
                key: task_key,
                armed: true,
            };
            let value = producer().await;

            let inner = Arc::clone(&guard.inner);
            let config = &inner.config;
            let ttl = config.ttl_for(value.is_degraded());
            {
                let mut state = inner.lock();
                state.store(
                    guard.key.clone(),
                    value.clone(),
                    ttl,
                    Instant::now(),
                    config.max_entries,
                );
                state.in_flight.remove(&guard.key);
            }
            guard.armed = false;
            value
        });

        async move {
            handle.await.map_err(|e| {
                let reason = if e.is_panic() {
                    "producer panicked".to_string()
                } else {
                    e.to_string()
                };
                tracing::warn!(key = %key, reason = %reason, "shared fetch aborted");
                CacheError::ProducerAborted {
                    key: key.to_string(),
                    reason,
                }
            })
        }
        .boxed()
        .shared()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock();
        CacheStats {
            entries: state.entries.len(),
            in_flight: state.in_flight.len(),
            ..state.stats
        }
    }
}

impl<V> std::fmt::Debug for CacheCoordinator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCoordinator")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drilldown_core::{Domain, NavigationRequest, PathStep};
    use futures_util::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Value {
        n: usize,
        degraded: bool,
    }

    impl CacheableResult for Value {
        fn is_degraded(&self) -> bool {
            self.degraded
        }
    }

    fn key(id: &str) -> CacheKey {
        let path = PathStep::new(id, id).into_iter().collect();
        CacheKey::for_request(&NavigationRequest::new(Domain::Services, path, 10))
    }

    fn coordinator(config: CacheConfig) -> CacheCoordinator<Value> {
        CacheCoordinator::new(config)
    }

    /// Producer that counts invocations and answers after `delay`.
    fn counting(
        calls: &Arc<AtomicUsize>,
        delay: Duration,
        degraded: bool,
    ) -> impl FnOnce() -> BoxFuture<'static, Value> + Send + 'static {
        let calls = Arc::clone(calls);
        move || {
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(delay).await;
                Value { n, degraded }
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_then_hit() {
        let cache = coordinator(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .resolve_or_join(key("a"), counting(&calls, Duration::ZERO, false))
            .await
            .unwrap();
        assert!(!first.cache_hit);
        assert!(!first.coalesced);

        let second = cache
            .resolve_or_join(key("a"), counting(&calls, Duration::ZERO, false))
            .await
            .unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.value, first.value);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.lookup(&key("a")), Some(first.value));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache = coordinator(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let callers = (0..10).map(|_| {
            cache.resolve_or_join(key("a"), counting(&calls, Duration::from_millis(50), false))
        });
        let results = join_all(callers).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let resolutions: Vec<Resolution<Value>> =
            results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(resolutions.iter().filter(|r| !r.coalesced).count(), 1);
        assert_eq!(resolutions.iter().filter(|r| r.coalesced).count(), 9);
        assert!(resolutions.iter().all(|r| r.value.n == 1));
        assert_eq!(cache.in_flight_count(), 0);
        assert_eq!(cache.stats().joins, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_keys_fetch_independently() {
        let cache = coordinator(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.resolve_or_join(key("a"), counting(&calls, Duration::from_millis(10), false)),
            cache.resolve_or_join(key("b"), counting(&calls, Duration::from_millis(10), false)),
        );
        assert!(!a.unwrap().coalesced);
        assert!(!b.unwrap().coalesced);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = coordinator(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .resolve_or_join(key("a"), counting(&calls, Duration::ZERO, false))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(cache.lookup(&key("a")).is_some(), "live at exactly the TTL");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.lookup(&key("a")).is_none());
        assert!(cache.is_empty());

        let again = cache
            .resolve_or_join(key("a"), counting(&calls, Duration::ZERO, false))
            .await
            .unwrap();
        assert!(!again.cache_hit);
        assert_eq!(again.value.n, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_degraded_values_use_short_ttl() {
        let cache = coordinator(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .resolve_or_join(key("stub"), counting(&calls, Duration::ZERO, true))
            .await
            .unwrap();
        cache
            .resolve_or_join(key("llm"), counting(&calls, Duration::ZERO, false))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.lookup(&key("stub")).is_none());
        assert!(cache.lookup(&key("llm")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest_inserted() {
        let cache = coordinator(CacheConfig::default().with_max_entries(2));
        let calls = Arc::new(AtomicUsize::new(0));

        for id in ["a", "b"] {
            cache
                .resolve_or_join(key(id), counting(&calls, Duration::ZERO, false))
                .await
                .unwrap();
        }
        // Reads do not refresh insertion order.
        assert!(cache.lookup(&key("a")).is_some());

        cache
            .resolve_or_join(key("c"), counting(&calls, Duration::ZERO, false))
            .await
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(&key("a")).is_none());
        assert!(cache.lookup(&key("b")).is_some());
        assert!(cache.lookup(&key("c")).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reresolution_moves_entry_to_newest() {
        let config = CacheConfig::default()
            .with_max_entries(2)
            .with_ttl(Duration::from_secs(10));
        let cache = coordinator(config);
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .resolve_or_join(key("a"), counting(&calls, Duration::ZERO, false))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        cache
            .resolve_or_join(key("b"), counting(&calls, Duration::ZERO, false))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;

        // "a" expired and is fetched again, becoming the newest entry.
        let a = cache
            .resolve_or_join(key("a"), counting(&calls, Duration::ZERO, false))
            .await
            .unwrap();
        assert!(!a.cache_hit);

        cache
            .resolve_or_join(key("c"), counting(&calls, Duration::ZERO, false))
            .await
            .unwrap();
        assert!(cache.lookup(&key("b")).is_none());
        assert!(cache.lookup(&key("a")).is_some());
        assert!(cache.lookup(&key("c")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_caller_does_not_cancel_fetch() {
        let cache = coordinator(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            cache.resolve_or_join(key("a"), counting(&calls, Duration::from_millis(100), false)),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(cache.in_flight_count(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(cache.in_flight_count(), 0);
        assert_eq!(cache.lookup(&key("a")).map(|v| v.n), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    async fn explode() -> Value {
        panic!("producer failure")
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_producer_clears_marker() {
        let cache = coordinator(CacheConfig::default());

        let err = cache
            .resolve_or_join(key("a"), explode)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::ProducerAborted { .. }));
        assert_eq!(cache.in_flight_count(), 0);
        assert!(cache.is_empty());

        let calls = Arc::new(AtomicUsize::new(0));
        let recovered = cache
            .resolve_or_join(key("a"), counting(&calls, Duration::ZERO, false))
            .await
            .unwrap();
        assert_eq!(recovered.value.n, 1);
    }
}
