//! Reaper Task
//!
//! Background thread that removes entries once their deadline passes.
//!
//! The thread sleeps on the store's condition variable until the earliest
//! deadline, or indefinitely while the store is empty. A plain wakeup only
//! recomputes the wait target; a timeout sweeps everything due at the current
//! time, which may be more than the entry it was waiting for.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info};

use crate::expiry::Shared;

/// Name given to every reaper thread.
pub(crate) const REAPER_THREAD_NAME: &str = "expire-map-reaper";

/// Spawns the reaper thread for one store.
///
/// # Errors
/// Returns the OS error if the thread cannot be created.
pub(crate) fn spawn<K, V>(shared: Arc<Shared<K, V>>) -> io::Result<JoinHandle<()>>
where
    K: Ord + Clone + Send + 'static,
    V: Send + 'static,
{
    thread::Builder::new()
        .name(REAPER_THREAD_NAME.to_string())
        .spawn(move || run(&shared))
}

fn run<K: Ord + Clone, V>(shared: &Shared<K, V>) {
    info!("Reaper started");

    let mut state = shared.lock();
    while !state.shutdown {
        state = match state.index.next_deadline() {
            None => {
                debug!("Reaper idle, store is empty");
                shared.wait(state)
            }
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                let (mut state, timed_out) = shared.wait_timeout(state, timeout);

                if timed_out && !state.shutdown {
                    let reclaimed = state.index.sweep(Instant::now());
                    debug!(
                        reclaimed,
                        remaining = state.index.len(),
                        "Reaper sweep complete"
                    );
                }
                state
            }
        };
    }
    drop(state);

    info!("Reaper stopped");
}
