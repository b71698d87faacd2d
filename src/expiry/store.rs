//! Expire Map Store Module
//!
//! Public store combining the expiry index, one lock, one condition variable,
//! and the background reaper that sweeps due entries.

use std::fmt;
use std::ops::DerefMut;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ExpireMapError, Result};
use crate::expiry::index::ExpiryIndex;
use crate::expiry::notifier::ChangeNotifier;
use crate::expiry::ExpiryStats;
use crate::tasks::reaper;

// == Shared State ==
/// Everything guarded by the store lock.
pub(crate) struct State<K, V> {
    pub(crate) index: ExpiryIndex<K, V>,
    /// Set once by teardown; the reaper exits when it observes it.
    pub(crate) shutdown: bool,
}

/// Lock and wake condition shared by callers and the reaper thread.
pub(crate) struct Shared<K, V> {
    state: Mutex<State<K, V>>,
    wake: Condvar,
}

impl<K, V> Shared<K, V> {
    pub(crate) fn lock(&self) -> MutexGuard<'_, State<K, V>> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Expire map lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Blocks until notified (or a spurious wakeup).
    pub(crate) fn wait<'a>(
        &self,
        guard: MutexGuard<'a, State<K, V>>,
    ) -> MutexGuard<'a, State<K, V>> {
        self.wake.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until notified or `timeout` elapses. The flag is true on timeout.
    pub(crate) fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, State<K, V>>,
        timeout: Duration,
    ) -> (MutexGuard<'a, State<K, V>>, bool) {
        let (guard, result) = self
            .wake
            .wait_timeout(guard, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        (guard, result.timed_out())
    }

    fn notify(&self) {
        self.wake.notify_all();
    }
}

// == Expire Map ==
/// Thread-safe key-value store where every entry has its own time-to-live.
///
/// Reads never expire anything themselves: an entry past its deadline stays
/// visible until the store's reaper thread sweeps it, which happens as soon as
/// the reaper's wait on the earliest deadline times out.
///
/// Dropping the store stops the reaper and releases all entries without
/// waiting for any pending deadline.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use expire_map::ExpireMap;
///
/// let sessions: ExpireMap<u32, String> = ExpireMap::new().unwrap();
/// sessions.insert(7, "alice".to_string(), Duration::from_secs(30));
/// assert_eq!(sessions.get(&7).as_deref(), Some("alice"));
/// ```
pub struct ExpireMap<K, V> {
    shared: Arc<Shared<K, V>>,
    reaper: Option<JoinHandle<()>>,
}

impl<K, V> ExpireMap<K, V>
where
    K: Ord + Clone + Send + 'static,
    V: Send + 'static,
{
    // == Constructor ==
    /// Creates an empty store and starts its reaper thread.
    ///
    /// # Errors
    /// Returns `ExpireMapError::ReaperSpawn` if the thread cannot be started.
    pub fn new() -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                index: ExpiryIndex::new(),
                shutdown: false,
            }),
            wake: Condvar::new(),
        });

        let reaper = reaper::spawn(Arc::clone(&shared)).map_err(ExpireMapError::ReaperSpawn)?;

        Ok(Self {
            shared,
            reaper: Some(reaper),
        })
    }

    // == Length ==
    /// Returns the number of live entries, including due entries not yet reaped.
    pub fn len(&self) -> usize {
        self.shared.lock().index.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Get ==
    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.shared.lock().index.get(key).map(|slot| slot.value.clone())
    }

    /// Returns true if `key` has a live entry.
    pub fn contains_key(&self, key: &K) -> bool {
        self.shared.lock().index.get(key).is_some()
    }

    // == Time To Live ==
    /// Time left before `key` expires, `Duration::ZERO` if it is already due.
    pub fn ttl(&self, key: &K) -> Option<Duration> {
        let state = self.shared.lock();
        let now = Instant::now();
        state
            .index
            .get(key)
            .map(|slot| slot.deadline.saturating_duration_since(now))
    }

    /// Value and remaining time for `key`, read under a single lock.
    pub fn get_with_ttl(&self, key: &K) -> Option<(V, Duration)>
    where
        V: Clone,
    {
        let state = self.shared.lock();
        let now = Instant::now();
        state.index.get(key).map(|slot| {
            (
                slot.value.clone(),
                slot.deadline.saturating_duration_since(now),
            )
        })
    }

    /// The earliest deadline in the store, if any entry exists.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.shared.lock().index.next_deadline()
    }

    // == Insert ==
    /// Stores `value` under `key`, expiring `ttl` from now.
    ///
    /// An existing entry for `key` is replaced entirely, its old deadline
    /// included. A zero `ttl` makes the entry due at once; the reaper
    /// reclaims it on its next pass. Returns the replaced value, if any.
    pub fn insert(&self, key: K, value: V, ttl: Duration) -> Option<V> {
        let mut state = self.modify();
        let now = Instant::now();
        state.index.insert(key, value, now, ttl)
    }

    /// Same as [`insert`](Self::insert) with the ttl given in milliseconds.
    pub fn insert_ms(&self, key: K, value: V, ttl_ms: u64) -> Option<V> {
        self.insert(key, value, Duration::from_millis(ttl_ms))
    }

    // == Remove ==
    /// Removes `key`. Returns the removed value, `None` if it was absent.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.modify().index.remove(key)
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) {
        let removed = self.modify().index.clear();
        debug!(removed, "Expire map cleared");
    }

    // == Purge Expired ==
    /// Sweeps due entries now instead of waiting for the reaper.
    ///
    /// Returns the number of entries reclaimed.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.modify();
        state.index.sweep(Instant::now())
    }

    // == Stats ==
    /// Returns a snapshot of the store counters.
    pub fn stats(&self) -> ExpiryStats {
        self.shared.lock().index.stats()
    }

    /// Counters plus the time left until the earliest deadline, taken from
    /// the same locked view.
    pub fn stats_with_next_expiry(&self) -> (ExpiryStats, Option<Duration>) {
        let state = self.shared.lock();
        let now = Instant::now();
        let next = state
            .index
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now));
        (state.index.stats(), next)
    }

    /// Checks the dictionary/deadline bijection under the lock.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.shared.lock().index.is_consistent()
    }

    /// Locks the store for a mutation. The reaper is woken when the guard
    /// drops if the earliest deadline moved in between.
    fn modify(&self) -> impl DerefMut<Target = State<K, V>> + '_ {
        let shared = &self.shared;
        ChangeNotifier::new(
            shared.lock(),
            |state: &State<K, V>| state.index.next_deadline(),
            move || {
                debug!("Earliest deadline moved, waking reaper");
                shared.notify();
            },
        )
    }
}

// == Teardown ==
impl<K, V> Drop for ExpireMap<K, V> {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.notify();

        if let Some(handle) = self.reaper.take() {
            if handle.join().is_err() {
                warn!("Reaper thread panicked before shutdown");
            }
        }
    }
}

impl<K: Ord + Clone, V> fmt::Debug for ExpireMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("ExpireMap")
            .field("len", &state.index.len())
            .field("shutdown", &state.shutdown)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::{self, sleep};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Polls `condition` every millisecond until it holds or `limit` passes.
    fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < limit {
            if condition() {
                return true;
            }
            sleep(ms(1));
        }
        condition()
    }

    fn assert_consistent<K, V>(map: &ExpireMap<K, V>)
    where
        K: Ord + Clone + Send + 'static,
        V: Send + 'static,
    {
        assert!(map.is_consistent());
    }

    #[test]
    fn test_store_new_is_empty() {
        let map: ExpireMap<i32, String> = ExpireMap::new().unwrap();

        assert_eq!(map.len(), 0);
        assert!(map.is_empty());
        for key in 10..14 {
            assert!(map.get(&key).is_none());
        }
        assert!(map.next_deadline().is_none());
    }

    #[test]
    fn test_store_insert_and_get() {
        let map = ExpireMap::new().unwrap();

        assert!(map.insert(10, "10".to_string(), ms(5_000)).is_none());

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&10).as_deref(), Some("10"));
        assert!(map.get(&11).is_none());
        assert!(map.contains_key(&10));
        assert_consistent(&map);
    }

    #[test]
    fn test_store_overwrite_returns_previous() {
        let map = ExpireMap::new().unwrap();

        map.insert("k", 1, ms(5_000));
        assert_eq!(map.insert("k", 2, ms(5_000)), Some(1));
        assert_eq!(map.get(&"k"), Some(2));
        assert_eq!(map.len(), 1);
        assert_consistent(&map);
    }

    #[test]
    fn test_store_overwrite_resets_ttl() {
        let map = ExpireMap::new().unwrap();

        map.insert("k", "a", ms(100));
        let before = map.ttl(&"k").unwrap();
        map.insert("k", "b", ms(10_000));
        let after = map.ttl(&"k").unwrap();

        assert!(before <= ms(100));
        assert!(after > ms(5_000));
    }

    #[test]
    fn test_store_remove() {
        let map = ExpireMap::new().unwrap();

        map.insert(1, "one", ms(5_000));
        assert_eq!(map.remove(&1), Some("one"));
        assert_eq!(map.remove(&1), None);
        assert!(map.is_empty());
        assert_consistent(&map);
    }

    #[test]
    fn test_store_remove_absent_is_noop() {
        let map: ExpireMap<u8, u8> = ExpireMap::new().unwrap();
        assert_eq!(map.remove(&3), None);
        assert_eq!(map.stats().removals, 0);
    }

    #[test]
    fn test_store_ttl_remaining() {
        let map = ExpireMap::new().unwrap();

        map.insert_ms("k", "v", 10_000);
        let remaining = map.ttl(&"k").unwrap();
        assert!(remaining <= ms(10_000));
        assert!(remaining >= ms(9_000));
        assert!(map.ttl(&"missing").is_none());
    }

    #[test]
    fn test_store_entry_expires() {
        let map = ExpireMap::new().unwrap();

        map.insert(10, "10", ms(30));
        assert_eq!(map.get(&10), Some("10"));

        assert!(eventually(ms(1_000), || map.get(&10).is_none()));
        assert_eq!(map.len(), 0);
        assert_eq!(map.stats().expired, 1);
    }

    #[test]
    fn test_store_shorter_deadline_wakes_reaper() {
        let map = ExpireMap::new().unwrap();

        // Reaper is now waiting on a far deadline
        map.insert(11, "11", ms(60_000));
        sleep(ms(10));
        map.insert(12, "12", ms(20));

        assert!(eventually(ms(1_000), || map.get(&12).is_none()));
        assert_eq!(map.get(&11), Some("11"));
    }

    #[test]
    fn test_store_identical_deadlines_reaped_in_one_sweep() {
        let map = ExpireMap::new().unwrap();
        map.insert(11, "11", ms(60_000));

        {
            let mut state = map.modify();
            let now = Instant::now();
            state.index.insert(12, "12", now, ms(30));
            state.index.insert(13, "13", now, ms(30));
        }
        assert_eq!(map.len(), 3);

        let mut observed = Vec::new();
        assert!(eventually(ms(1_000), || {
            let len = map.len();
            observed.push(len);
            len == 1
        }));

        assert!(!observed.contains(&2), "both entries must go in one sweep");
        assert_eq!(map.get(&11), Some("11"));
        assert_consistent(&map);
    }

    #[test]
    fn test_store_zero_ttl_is_reaped() {
        let map = ExpireMap::new().unwrap();

        map.insert("gone", 0u8, Duration::ZERO);
        assert!(eventually(ms(1_000), || map.is_empty()));
    }

    #[test]
    fn test_store_purge_expired_on_demand() {
        let map = ExpireMap::new().unwrap();
        {
            // Insert through the index directly so the reaper is not woken
            let mut state = map.shared.lock();
            let past = Instant::now() - ms(50);
            state.index.insert(1, "old", past, ms(10));
            state.index.insert(2, "fresh", Instant::now(), ms(60_000));
        }

        assert_eq!(map.purge_expired(), 1);
        assert!(map.get(&1).is_none());
        assert_eq!(map.get(&2), Some("fresh"));
        assert_consistent(&map);
    }

    #[test]
    fn test_store_clear() {
        let map = ExpireMap::new().unwrap();

        map.insert(1, 1, ms(5_000));
        map.insert(2, 2, ms(5_000));
        map.clear();

        assert!(map.is_empty());
        assert!(map.next_deadline().is_none());
        assert_eq!(map.stats().removals, 2);
    }

    #[test]
    fn test_store_drop_does_not_wait_for_ttl() {
        let map = ExpireMap::new().unwrap();
        map.insert(11, "11", ms(500));
        map.insert(12, "12", ms(60_000));

        let start = Instant::now();
        drop(map);
        assert!(start.elapsed() < ms(50));
    }

    #[test]
    fn test_store_drop_idle_reaper() {
        let map: ExpireMap<u32, u32> = ExpireMap::new().unwrap();
        sleep(ms(5));

        let start = Instant::now();
        drop(map);
        assert!(start.elapsed() < ms(50));
    }

    #[test]
    fn test_store_concurrent_access_keeps_index_consistent() {
        let map = Arc::new(ExpireMap::new().unwrap());

        let workers: Vec<_> = (0..8u64)
            .map(|worker| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for step in 0..400u64 {
                        let key = (worker * 7 + step * 13) % 32;
                        match step % 4 {
                            0 | 1 => {
                                map.insert(key, step, ms(1 + step % 15));
                            }
                            2 => {
                                let _ = map.get(&key);
                            }
                            _ => {
                                map.remove(&key);
                            }
                        }
                        assert!(map.is_consistent());
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert!(map.is_consistent());
        assert!(eventually(ms(1_000), || map.is_empty()));
    }

    #[test]
    fn test_store_reaper_thread_is_named() {
        let map: ExpireMap<u32, u32> = ExpireMap::new().unwrap();
        let name = map.reaper.as_ref().and_then(|handle| handle.thread().name());
        assert_eq!(name, Some(reaper::REAPER_THREAD_NAME));
    }

    #[test]
    fn test_store_debug_format() {
        let map = ExpireMap::new().unwrap();
        map.insert(1, 1, ms(5_000));
        let debug = format!("{:?}", map);
        assert!(debug.contains("len: 1"));
        assert!(debug.contains("shutdown: false"));
    }

    #[test]
    fn test_store_debug_format_without_debug_values() {
        struct Opaque;

        let map: ExpireMap<String, Opaque> = ExpireMap::new().unwrap();
        map.insert("a".to_string(), Opaque, ms(5_000));
        map.insert("b".to_string(), Opaque, ms(5_000));
        assert_eq!(format!("{:?}", map), "ExpireMap { len: 2, shutdown: false }");
    }

    #[test]
    fn test_store_get_with_ttl() {
        let map = ExpireMap::new().unwrap();

        map.insert("k", "v", ms(10_000));
        let (value, remaining) = map.get_with_ttl(&"k").unwrap();
        assert_eq!(value, "v");
        assert!(remaining <= ms(10_000));
        assert!(remaining >= ms(9_000));
        assert!(map.get_with_ttl(&"missing").is_none());
    }

    #[test]
    fn test_store_get_with_ttl_due_entry_reports_zero() {
        let map = ExpireMap::new().unwrap();
        {
            // Due but not yet reaped: the reaper is not woken here
            let mut state = map.shared.lock();
            state.index.insert("due", 1, Instant::now() - ms(50), ms(10));
        }

        assert_eq!(map.get_with_ttl(&"due"), Some((1, Duration::ZERO)));
    }

    #[test]
    fn test_store_stats_with_next_expiry() {
        let map = ExpireMap::new().unwrap();

        let (stats, next) = map.stats_with_next_expiry();
        assert_eq!(stats.live_entries, 0);
        assert!(next.is_none());

        map.insert(1, 1, ms(10_000));
        map.insert(2, 2, ms(60_000));
        let (stats, next) = map.stats_with_next_expiry();
        assert_eq!(stats.live_entries, 2);
        assert!(next.unwrap() <= ms(10_000));
    }
}
