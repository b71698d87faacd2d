//! Change Notifier Module
//!
//! A scope guard that observes a quantity of the value it guards when created
//! and again when dropped, and fires a callback only if the quantity changed.
//! The store wraps its lock guard in one of these so that any mutation that
//! moves the earliest deadline wakes the reaper.

use std::ops::{Deref, DerefMut};

// == Change Notifier ==
/// Owns a guard `G`, dereferences to its target and, on drop, calls `notify`
/// once if `fetch` yields a different value than it did at construction.
///
/// Drop runs on every exit path, early returns and unwinding included. The
/// comparison happens while `G` is still alive, so a lock guard is released
/// only after the notification.
pub(crate) struct ChangeNotifier<G, Q, F, N>
where
    G: Deref,
    Q: PartialEq,
    F: Fn(&G::Target) -> Q,
    N: FnOnce(),
{
    guard: G,
    before: Q,
    fetch: F,
    notify: Option<N>,
}

impl<G, Q, F, N> ChangeNotifier<G, Q, F, N>
where
    G: Deref,
    Q: PartialEq,
    F: Fn(&G::Target) -> Q,
    N: FnOnce(),
{
    pub(crate) fn new(guard: G, fetch: F, notify: N) -> Self {
        let before = fetch(&*guard);
        Self {
            guard,
            before,
            fetch,
            notify: Some(notify),
        }
    }
}

impl<G, Q, F, N> Deref for ChangeNotifier<G, Q, F, N>
where
    G: Deref,
    Q: PartialEq,
    F: Fn(&G::Target) -> Q,
    N: FnOnce(),
{
    type Target = G::Target;

    fn deref(&self) -> &Self::Target {
        &*self.guard
    }
}

impl<G, Q, F, N> DerefMut for ChangeNotifier<G, Q, F, N>
where
    G: DerefMut,
    Q: PartialEq,
    F: Fn(&G::Target) -> Q,
    N: FnOnce(),
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.guard
    }
}

impl<G, Q, F, N> Drop for ChangeNotifier<G, Q, F, N>
where
    G: Deref,
    Q: PartialEq,
    F: Fn(&G::Target) -> Q,
    N: FnOnce(),
{
    fn drop(&mut self) {
        if (self.fetch)(&*self.guard) != self.before {
            if let Some(notify) = self.notify.take() {
                notify();
            }
        }
    }
}
