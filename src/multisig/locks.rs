//! Per-transaction serialization
//!
//! Each transaction ID maps to its own mutex in a sharded map, so work on
//! different transactions never contends on a shared lock. Waiting for a
//! lock observes the caller's [`Context`].

use crate::multisig::context::Context;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;

pub type TxLock = Arc<Mutex<()>>;

#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<String, TxLock>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `tx_id`, created on first use
    pub fn lock_for(&self, tx_id: &str) -> TxLock {
        if let Some(lock) = self.locks.get(tx_id) {
            return Arc::clone(lock.value());
        }
        Arc::clone(
            self.locks
                .entry(tx_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Called with a lock from [`lock_for`](Self::lock_for) once its guard
    /// is dropped. The entry is removed when no other caller still holds a
    /// handle to it.
    pub fn release(&self, tx_id: &str, lock: &TxLock) {
        // Table + `lock` are the only handles; checked under the shard lock
        self.locks.remove_if(tx_id, |_, entry| {
            Arc::ptr_eq(entry, lock) && Arc::strong_count(entry) == 2
        });
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Block until `lock` is held, the context is cancelled, or its deadline
/// passes. Returns `None` when the context ended first.
pub fn acquire<'a>(
    ctx: &Context,
    lock: &'a Mutex<()>,
    poll_interval: Duration,
) -> Option<MutexGuard<'a, ()>> {
    loop {
        if ctx.is_done() {
            return None;
        }
        let wait = match ctx.remaining() {
            Some(left) => left.min(poll_interval),
            None => poll_interval,
        };
        if let Some(guard) = lock.try_lock_for(wait) {
            // Cancellation that raced with the acquire still wins
            if ctx.is_done() {
                return None;
            }
            return Some(guard);
        }
    }
}
