//! Expiry Index Module
//!
//! The dual structure behind the store: a dictionary keyed by entry key and an
//! ordering of `(deadline, key)` records. Each side locates the other by value,
//! so neither holds handles that could be invalidated by sibling mutation.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use crate::expiry::ExpiryStats;

/// Far-future fallback for deadlines that would overflow `Instant`.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

// == Slot ==
/// Dictionary record: the stored value plus the deadline of its expiry record.
#[derive(Debug, Clone)]
pub(crate) struct Slot<V> {
    pub(crate) value: V,
    pub(crate) deadline: Instant,
}

// == Expiry Index ==
/// Dictionary and deadline ordering, always mutated together.
#[derive(Debug)]
pub(crate) struct ExpiryIndex<K, V> {
    entries: BTreeMap<K, Slot<V>>,
    schedule: BTreeSet<(Instant, K)>,
    stats: ExpiryStats,
}

impl<K: Ord + Clone, V> ExpiryIndex<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            schedule: BTreeSet::new(),
            stats: ExpiryStats::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&self, key: &K) -> Option<&Slot<V>> {
        self.entries.get(key)
    }

    /// Earliest deadline in the ordering, `None` when the index is empty.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.schedule.first().map(|(deadline, _)| *deadline)
    }

    // == Insert ==
    /// Inserts `key` with a deadline of `now + ttl`.
    ///
    /// An existing pair for `key` is removed in full first; its old deadline
    /// is discarded. Returns the previous value, if any.
    pub(crate) fn insert(&mut self, key: K, value: V, now: Instant, ttl: Duration) -> Option<V> {
        let previous = self.take(&key);
        if previous.is_some() {
            self.stats.record_overwrite();
        }

        let deadline = deadline_after(now, ttl);
        let record = (deadline, key.clone());
        self.schedule.insert(record);
        self.entries.insert(key, Slot { value, deadline });
        self.stats.record_insert();

        previous
    }

    // == Remove ==
    /// Removes both records for `key`. No-op when absent.
    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.take(key);
        if removed.is_some() {
            self.stats.record_removal();
        }
        removed
    }

    // == Clear ==
    /// Drops every entry. Returns how many were removed.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.schedule.clear();
        for _ in 0..count {
            self.stats.record_removal();
        }
        count
    }

    // == Sweep ==
    /// Removes every entry whose deadline is at or before `now`, in ascending
    /// deadline order. Returns the number of entries reclaimed.
    pub(crate) fn sweep(&mut self, now: Instant) -> usize {
        let mut reclaimed = 0;

        while self
            .schedule
            .first()
            .is_some_and(|(deadline, _)| *deadline <= now)
        {
            if let Some((_, key)) = self.schedule.pop_first() {
                self.entries.remove(&key);
                reclaimed += 1;
            }
        }

        self.stats.record_sweep(reclaimed);
        reclaimed
    }

    pub(crate) fn stats(&self) -> ExpiryStats {
        let mut stats = self.stats.clone();
        stats.set_live_entries(self.entries.len());
        stats
    }

    fn take(&mut self, key: &K) -> Option<V> {
        // Clone before touching either side so both removals happen together
        let record = (self.entries.get(key)?.deadline, key.clone());
        self.schedule.remove(&record);
        self.entries.remove(key).map(|slot| slot.value)
    }

    /// Checks the one-to-one correspondence between dictionary and ordering.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.entries.len() == self.schedule.len()
            && self.schedule.iter().all(|(deadline, key)| {
                self.entries
                    .get(key)
                    .is_some_and(|slot| slot.deadline == *deadline)
            })
    }
}

/// `now + ttl`, saturating to a far-future deadline instead of overflowing.
pub(crate) fn deadline_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(MAX_TTL))
        .unwrap_or(now)
}
