//! Expiry Module
//!
//! Provides the TTL store: a dictionary and a deadline ordering kept in
//! lockstep, guarded by one lock and swept by a background reaper.

mod index;
mod notifier;
mod stats;
mod store;


// Re-export public types
pub use stats::ExpiryStats;
pub use store::ExpireMap;

pub(crate) use store::Shared;
