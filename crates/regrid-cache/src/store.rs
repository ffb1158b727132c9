//! In-process cache tier with per-key in-flight markers.
//!
//! The map lock is held only for individual map operations, never while a
//! missing entry is being computed. A key being computed holds a pending
//! marker; further requesters block on the condvar until the marker
//! resolves, so a kernel runs at most once per key per process.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

enum Slot<V> {
    Ready(Arc<V>),
    Pending,
}

/// Result of [`Store::claim`].
pub(crate) enum Claim<V> {
    /// The key is committed; here is the shared value.
    Hit(Arc<V>),
    /// The caller now owns the pending marker and must finish with
    /// [`Store::commit`] or [`Store::abandon`].
    Claimed,
}

pub(crate) struct Store<V> {
    slots: Mutex<HashMap<String, Slot<V>>>,
    resolved: Condvar,
}

impl<V> Store<V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            resolved: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot<V>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up `key`, claiming it when absent.
    ///
    /// Blocks while another thread holds the key's pending marker; when
    /// that thread commits, this returns its value, and when it abandons,
    /// this thread claims the key itself.
    pub(crate) fn claim(&self, key: &str) -> Claim<V> {
        let mut slots = self.lock();
        loop {
            match slots.get(key) {
                Some(Slot::Ready(value)) => return Claim::Hit(Arc::clone(value)),
                Some(Slot::Pending) => {
                    slots = self
                        .resolved
                        .wait(slots)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                None => {
                    slots.insert(key.to_string(), Slot::Pending);
                    return Claim::Claimed;
                }
            }
        }
    }

    /// Look up `key` without claiming it.
    ///
    /// Blocks while the key is pending, then returns the committed value
    /// or `None`.
    pub(crate) fn lookup(&self, key: &str) -> Option<Arc<V>> {
        let mut slots = self.lock();
        loop {
            match slots.get(key) {
                Some(Slot::Ready(value)) => return Some(Arc::clone(value)),
                Some(Slot::Pending) => {
                    slots = self
                        .resolved
                        .wait(slots)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                None => return None,
            }
        }
    }

    /// Commit a value for `key`. First committer wins: if a value is
    /// already present the new one is discarded and the committed value
    /// returned, flagged `false`.
    pub(crate) fn commit(&self, key: &str, value: V) -> (Arc<V>, bool) {
        let mut slots = self.lock();
        let result = match slots.get(key) {
            Some(Slot::Ready(existing)) => (Arc::clone(existing), false),
            _ => {
                let value = Arc::new(value);
                slots.insert(key.to_string(), Slot::Ready(Arc::clone(&value)));
                (value, true)
            }
        };
        drop(slots);
        self.resolved.notify_all();
        result
    }

    /// Drop the pending marker for `key` after a failed computation,
    /// waking waiters so one of them can retry.
    pub(crate) fn abandon(&self, key: &str) {
        let mut slots = self.lock();
        if let Some(Slot::Pending) = slots.get(key) {
            slots.remove(key);
        }
        drop(slots);
        self.resolved.notify_all();
    }
}
