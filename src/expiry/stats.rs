//! Expiry Statistics Module
//!
//! Tracks how entries enter and leave the store.

use serde::Serialize;

// == Expiry Stats ==
/// Counters describing store activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpiryStats {
    /// Number of writes, overwrites included
    pub inserts: u64,
    /// Writes that replaced an existing entry
    pub overwrites: u64,
    /// Entries removed explicitly (remove or clear)
    pub removals: u64,
    /// Entries reclaimed because their deadline passed
    pub expired: u64,
    /// Number of sweeps performed, by the reaper or on demand
    pub sweeps: u64,
    /// Current number of live entries
    pub live_entries: usize,
}

impl ExpiryStats {
    // == Constructor ==
    /// Creates a new ExpiryStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_insert(&mut self) {
        self.inserts += 1;
    }

    pub(crate) fn record_overwrite(&mut self) {
        self.overwrites += 1;
    }

    pub(crate) fn record_removal(&mut self) {
        self.removals += 1;
    }

    // == Record Sweep ==
    /// Counts one sweep and the entries it reclaimed.
    pub(crate) fn record_sweep(&mut self, reclaimed: usize) {
        self.sweeps += 1;
        self.expired += reclaimed as u64;
    }

    pub(crate) fn set_live_entries(&mut self, count: usize) {
        self.live_entries = count;
    }
}
