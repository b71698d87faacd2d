//! Background Tasks Module
//!
//! Contains the background work that runs alongside each store.
//!
//! # Tasks
//! - Reaper: one thread per store that sweeps entries once their deadline passes

pub(crate) mod reaper;
